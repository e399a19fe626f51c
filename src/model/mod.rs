pub mod bucket;
pub mod config;
pub mod document;
pub mod node;

pub use bucket::*;
pub use config::*;
pub use document::*;
pub use node::*;
