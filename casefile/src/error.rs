use casefile_api::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CasefileError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CasefileError>;
