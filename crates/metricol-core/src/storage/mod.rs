//! Storage backends.

pub mod database;
pub mod file;
pub mod memory;

pub use database::DatabaseStore;
pub use file::{FileStore, FileStoreConfig};
pub use memory::MemoryStore;
