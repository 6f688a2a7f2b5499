use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// StoredFile 表示分块文件存储中的一个文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub file_name: String,
    pub content_type: String,
    /// 上传时间（毫秒精度）
    pub upload_date: DateTime<Utc>,
    pub length: u64,
}

/// FileStore trait 定义分块文件存储操作
///
/// 文件由 `(bucket, file_name)` 唯一确定。
#[async_trait]
pub trait FileStore: Send + Sync {
    /// 文件所在的数据库名称
    fn database_name(&self) -> &str;

    async fn find_one(&self, bucket: &str, file_name: &str) -> Result<Option<StoredFile>>;

    async fn create(
        &self,
        bucket: &str,
        file_name: &str,
        content_type: &str,
        content: &[u8],
    ) -> Result<StoredFile>;

    /// 删除同名文件，返回删除数量
    async fn remove(&self, bucket: &str, file_name: &str) -> Result<u64>;

    async fn read(&self, bucket: &str, file_name: &str) -> Result<Option<Vec<u8>>>;

    async fn shutdown(&self) -> Result<()>;
}
