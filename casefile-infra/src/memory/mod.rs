pub mod file_store;
pub mod matcher;
pub mod persistence;

pub use file_store::MemoryFileStore;
pub use persistence::MemoryPersistenceProvider;
