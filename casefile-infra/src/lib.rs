pub mod database;
pub mod fetch;
pub mod gridfs;
pub mod memory;
pub mod persistence;
pub mod sniffer;

pub use database::DatabaseManager;
pub use fetch::HttpFetcher;
pub use gridfs::GridFsFileStore;
pub use memory::{MemoryFileStore, MemoryPersistenceProvider};
pub use persistence::MongoPersistenceProvider;
pub use sniffer::MagicContentSniffer;
