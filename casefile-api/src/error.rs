use thiserror::Error;

/// StorageError 是持久化、文件存储和下载操作的统一错误类型
///
/// 所有组件都不在本地恢复错误，错误原样返回给最外层调用者。
#[derive(Error, Debug)]
pub enum StorageError {
    /// 数据库或文件存储不可达
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 远程文件下载失败
    #[error("Download error: {0}")]
    Download(String),

    /// 查询语句无法解析或参数绑定失败
    #[error("Query error: {0}")]
    Query(String),

    #[error("Missing identifier: {0}")]
    MissingIdentifier(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate identifier: {0}")]
    Duplicate(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 连接已经通过shutdown释放
    #[error("Resource closed: {0}")]
    Closed(String),

    /// 底层提供者返回的其他错误
    #[error("Provider error: {0}")]
    Provider(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
