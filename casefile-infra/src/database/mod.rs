pub mod error;
pub mod manager;

pub use error::map_mongo_error;
pub use manager::DatabaseManager;
