pub mod datasource;
pub mod entity;
pub mod error;
pub mod file_store;
pub mod persistence;
pub mod query;
pub mod source;

pub use datasource::DataSourceConfig;
pub use entity::{Entity, EntityId, EntityKind, ID_FIELD};
pub use error::{Result, StorageError};
pub use file_store::{FileStore, StoredFile};
pub use persistence::PersistenceProvider;
pub use query::{Condition, ParsedQuery, Parameters, Statement};
pub use source::{ContentSniffer, FileSource, RemoteFetcher};
