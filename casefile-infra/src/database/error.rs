use casefile_api::StorageError;
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};

/// 重复键错误码
const DUPLICATE_KEY: i32 = 11000;

/// 将MongoDB错误映射为StorageError
pub fn map_mongo_error(err: MongoError) -> StorageError {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::ConnectionPoolCleared { .. } => StorageError::Connectivity(err.to_string()),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY => {
            StorageError::Duplicate(write_error.message.clone())
        }
        ErrorKind::BsonSerialization(_) | ErrorKind::BsonDeserialization(_) => {
            StorageError::Serialization(err.to_string())
        }
        _ => StorageError::Provider(err.to_string()),
    }
}
