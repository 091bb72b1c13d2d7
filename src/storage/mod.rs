mod file_storage;
mod memory;
mod models;
pub mod oplog;
mod store;

pub use file_storage::FileStorage;
pub use memory::{MemoryActivityLog, MemoryItemStore};
pub use models::*;
pub use store::{ActivityLog, ItemStore};
