#[cfg(test)]
mod tests;
mod transient;

pub use transient::TransientFile;

use async_trait::async_trait;
use casefile_api::{
    ContentSniffer, FileSource, FileStore, RemoteFetcher, Result, StorageError, StoredFile,
};
use casefile_domain::Attachment;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// AttachmentService trait 把文件内容放入分块存储并生成附件元数据
///
/// 服务不修改任何实体，调用方负责把返回的附件加入实体后再保存实体。
#[async_trait]
pub trait AttachmentService: Send + Sync {
    /// 存储文件并返回附件元数据
    async fn add_file(
        &self,
        source: FileSource,
        bucket: &str,
        overwrite_existing: bool,
    ) -> Result<Attachment>;

    /// 删除bucket中的同名文件，返回删除数量
    async fn remove_file(&self, file_name: &str, bucket: &str) -> Result<u64>;

    async fn shutdown(&self) -> Result<()>;
}

/// GridFsAttachmentService 默认实现
pub struct GridFsAttachmentService {
    file_store: Arc<dyn FileStore>,
    sniffer: Arc<dyn ContentSniffer>,
    fetcher: Arc<dyn RemoteFetcher>,
    rest_url: String,
    closed: AtomicBool,
}

impl GridFsAttachmentService {
    pub fn new(
        file_store: Arc<dyn FileStore>,
        sniffer: Arc<dyn ContentSniffer>,
        fetcher: Arc<dyn RemoteFetcher>,
        rest_url: impl Into<String>,
    ) -> Self {
        Self {
            file_store,
            sniffer,
            fetcher,
            rest_url: rest_url.into(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed("attachment service has been shut down".to_string()));
        }
        Ok(())
    }

    fn metadata(&self, file: &StoredFile, bucket: &str) -> Attachment {
        Attachment::from_stored(file, &self.rest_url, self.file_store.database_name(), bucket)
    }
}

#[async_trait]
impl AttachmentService for GridFsAttachmentService {
    async fn add_file(
        &self,
        source: FileSource,
        bucket: &str,
        overwrite_existing: bool,
    ) -> Result<Attachment> {
        self.ensure_open()?;
        if bucket.is_empty() {
            return Err(StorageError::InvalidArgument("Bucket name must not be empty".to_string()));
        }
        let file_name = source.file_name()?;

        // 1. 远程文件先下载到临时目录，transient 存活到本函数结束
        let (_transient, path): (Option<TransientFile>, PathBuf) = match &source {
            FileSource::Remote(url) => {
                let transient = TransientFile::download(self.fetcher.as_ref(), url, &file_name).await?;
                let path = transient.path().to_path_buf();
                (Some(transient), path)
            }
            FileSource::Local(path) => (None, path.clone()),
        };

        // 2. 检查是否已存在
        let existing = self.file_store.find_one(bucket, &file_name).await?;

        // 3. 内容类型只根据文件字节判断
        let content = tokio::fs::read(&path).await?;
        let content_type = self.sniffer.detect(&content);

        // 4. 按已存在与覆盖策略决定是否写入
        let stored = match existing {
            Some(file) if !overwrite_existing => {
                let attachment = self.metadata(&file, bucket);
                info!(url = %attachment.url(), "File already exists");
                return Ok(attachment);
            }
            Some(_) => {
                let removed = self.file_store.remove(bucket, &file_name).await?;
                debug!(bucket, file_name = %file_name, removed, "Existing file removed before overwrite");
                self.file_store
                    .create(bucket, &file_name, &content_type, &content)
                    .await?
            }
            None => {
                self.file_store
                    .create(bucket, &file_name, &content_type, &content)
                    .await?
            }
        };

        let attachment = self.metadata(&stored, bucket);
        info!(url = %attachment.url(), content_type = %attachment.content_type(), "File stored");
        Ok(attachment)
    }

    async fn remove_file(&self, file_name: &str, bucket: &str) -> Result<u64> {
        self.ensure_open()?;
        let removed = self.file_store.remove(bucket, file_name).await?;
        debug!(bucket, file_name, removed, "File removed");
        Ok(removed)
    }

    async fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StorageError::Closed("attachment service has already been shut down".to_string()));
        }
        self.file_store.shutdown().await?;
        info!(database = %self.file_store.database_name(), "Attachment service shut down");
        Ok(())
    }
}
