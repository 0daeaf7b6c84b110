//! Persistence layer: the `MatchStore` abstraction and the in-memory backend.

pub mod match_store;
pub mod memory;
pub mod storage;

pub use self::match_store::MatchStore;
pub use self::memory::InMemoryMatchStore;
pub use self::storage::{StorageError, StorageResult};
