pub mod edit;
pub mod grouping;
pub mod locate;
pub mod relocate;
pub mod rules;
