pub mod cache;
pub mod config_io;
pub mod fs_store;
pub mod memory_store;
pub mod squelch;
pub mod store;
pub mod workspace;
