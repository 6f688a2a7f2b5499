use crate::database::{map_mongo_error, DatabaseManager};
use async_trait::async_trait;
use casefile_api::{FileStore, Result, StorageError, StoredFile, ID_FIELD};
use chrono::{DateTime, Utc};
use futures_util::io::{AsyncReadExt, AsyncWriteExt};
use futures_util::TryStreamExt;
use mongodb::bson::{Bson, Document};
use mongodb::gridfs::{FilesCollectionDocument, GridFsBucket};
use mongodb::options::GridFsBucketOptions;
use std::sync::Arc;
use tracing::debug;

/// 内容类型保存在文件文档的 `metadata.contentType` 中
const CONTENT_TYPE_KEY: &str = "contentType";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// GridFsFileStore 使用MongoDB GridFS实现的分块文件存储
///
/// 每个逻辑bucket对应一个GridFS bucket。同名文件存在多个版本时以最新上传的为准。
pub struct GridFsFileStore {
    manager: Arc<DatabaseManager>,
}

impl GridFsFileStore {
    pub fn new(manager: Arc<DatabaseManager>) -> Self {
        Self { manager }
    }

    fn bucket(&self, bucket: &str) -> GridFsBucket {
        let options = GridFsBucketOptions::builder()
            .bucket_name(bucket.to_string())
            .build();
        self.manager.database().gridfs_bucket(options)
    }

    async fn find_all(&self, bucket: &GridFsBucket, filter: Document) -> Result<Vec<FilesCollectionDocument>> {
        let cursor = bucket.find(filter).await.map_err(map_mongo_error)?;
        cursor.try_collect().await.map_err(map_mongo_error)
    }

    async fn find_latest(&self, bucket: &GridFsBucket, file_name: &str) -> Result<Option<FilesCollectionDocument>> {
        let files = self.find_all(bucket, name_filter(file_name)).await?;
        Ok(files.into_iter().max_by_key(|file| file.upload_date))
    }
}

fn name_filter(file_name: &str) -> Document {
    let mut filter = Document::new();
    filter.insert("filename", file_name);
    filter
}

fn to_stored(file: &FilesCollectionDocument) -> Result<StoredFile> {
    let upload_date = DateTime::<Utc>::from_timestamp_millis(file.upload_date.timestamp_millis())
        .ok_or_else(|| {
            StorageError::Serialization(format!("Invalid upload date: {}", file.upload_date))
        })?;
    let content_type = file
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.get_str(CONTENT_TYPE_KEY).ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    Ok(StoredFile {
        file_name: file.filename.clone().unwrap_or_default(),
        content_type: content_type.to_string(),
        upload_date,
        length: file.length,
    })
}

#[async_trait]
impl FileStore for GridFsFileStore {
    fn database_name(&self) -> &str {
        self.manager.database_name()
    }

    async fn find_one(&self, bucket: &str, file_name: &str) -> Result<Option<StoredFile>> {
        let bucket = self.bucket(bucket);
        self.find_latest(&bucket, file_name)
            .await?
            .as_ref()
            .map(to_stored)
            .transpose()
    }

    async fn create(
        &self,
        bucket_name: &str,
        file_name: &str,
        content_type: &str,
        content: &[u8],
    ) -> Result<StoredFile> {
        let bucket = self.bucket(bucket_name);

        let mut metadata = Document::new();
        metadata.insert(CONTENT_TYPE_KEY, content_type);

        let mut stream = bucket
            .open_upload_stream(file_name)
            .metadata(metadata)
            .await
            .map_err(map_mongo_error)?;
        stream.write_all(content).await?;
        stream.close().await?;
        let id: Bson = stream.id().clone();

        let mut filter = Document::new();
        filter.insert(ID_FIELD, id);
        let file = self
            .find_all(&bucket, filter)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                StorageError::NotFound(format!("{}/{} after upload", bucket_name, file_name))
            })?;

        debug!(bucket = bucket_name, file_name, length = file.length, "File stored in GridFS");
        to_stored(&file)
    }

    async fn remove(&self, bucket_name: &str, file_name: &str) -> Result<u64> {
        let bucket = self.bucket(bucket_name);
        let files = self.find_all(&bucket, name_filter(file_name)).await?;
        let mut removed = 0;
        for file in files {
            bucket.delete(file.id).await.map_err(map_mongo_error)?;
            removed += 1;
        }
        debug!(bucket = bucket_name, file_name, removed, "Files removed from GridFS");
        Ok(removed)
    }

    async fn read(&self, bucket_name: &str, file_name: &str) -> Result<Option<Vec<u8>>> {
        let bucket = self.bucket(bucket_name);
        let Some(file) = self.find_latest(&bucket, file_name).await? else {
            return Ok(None);
        };
        let mut stream = bucket
            .open_download_stream(file.id)
            .await
            .map_err(map_mongo_error)?;
        let mut content = Vec::with_capacity(file.length as usize);
        stream.read_to_end(&mut content).await?;
        Ok(Some(content))
    }

    async fn shutdown(&self) -> Result<()> {
        self.manager.shutdown().await;
        Ok(())
    }
}
