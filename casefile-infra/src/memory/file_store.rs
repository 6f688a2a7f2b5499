use async_trait::async_trait;
use casefile_api::{FileStore, Result, StorageError, StoredFile};
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::debug;

struct MemoryFile {
    stored: StoredFile,
    content: Vec<u8>,
}

#[derive(Default)]
struct State {
    files: IndexMap<(String, String), MemoryFile>,
    last_upload: Option<DateTime<Utc>>,
}

impl State {
    /// 毫秒精度的上传时间，严格递增
    fn next_upload_date(&mut self) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        let now = DateTime::<Utc>::from_timestamp_millis(now.timestamp_millis())
            .ok_or_else(|| StorageError::Provider(format!("Timestamp out of range: {}", now)))?;
        let date = match self.last_upload {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last_upload = Some(date);
        Ok(date)
    }
}

/// MemoryFileStore 分块文件存储的内存实现
pub struct MemoryFileStore {
    database_name: String,
    state: RwLock<State>,
}

impl MemoryFileStore {
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            state: RwLock::new(State::default()),
        }
    }

    fn key(bucket: &str, file_name: &str) -> (String, String) {
        (bucket.to_string(), file_name.to_string())
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    fn database_name(&self) -> &str {
        &self.database_name
    }

    async fn find_one(&self, bucket: &str, file_name: &str) -> Result<Option<StoredFile>> {
        let state = self.state.read().await;
        Ok(state
            .files
            .get(&Self::key(bucket, file_name))
            .map(|file| file.stored.clone()))
    }

    async fn create(
        &self,
        bucket: &str,
        file_name: &str,
        content_type: &str,
        content: &[u8],
    ) -> Result<StoredFile> {
        let mut state = self.state.write().await;
        let stored = StoredFile {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            upload_date: state.next_upload_date()?,
            length: content.len() as u64,
        };
        state.files.insert(
            Self::key(bucket, file_name),
            MemoryFile {
                stored: stored.clone(),
                content: content.to_vec(),
            },
        );
        debug!(bucket, file_name, length = stored.length, "File stored in memory");
        Ok(stored)
    }

    async fn remove(&self, bucket: &str, file_name: &str) -> Result<u64> {
        let mut state = self.state.write().await;
        let removed = state.files.shift_remove(&Self::key(bucket, file_name));
        Ok(removed.map(|_| 1).unwrap_or(0))
    }

    async fn read(&self, bucket: &str, file_name: &str) -> Result<Option<Vec<u8>>> {
        let state = self.state.read().await;
        Ok(state
            .files
            .get(&Self::key(bucket, file_name))
            .map(|file| file.content.clone()))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryFileStore::new("casefile");
        let stored = store.create("image", "a.jpg", "image/jpeg", b"jpeg bytes").await.unwrap();

        let found = store.find_one("image", "a.jpg").await.unwrap().unwrap();
        assert_eq!(found, stored);
        assert_eq!(found.length, 10);
        assert!(store.find_one("kml", "a.jpg").await.unwrap().is_none());
        assert_eq!(store.read("image", "a.jpg").await.unwrap().unwrap(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_upload_dates_strictly_increase() {
        let store = MemoryFileStore::new("casefile");
        let first = store.create("b", "a.txt", "text/plain", b"1").await.unwrap();
        let second = store.create("b", "a.txt", "text/plain", b"2").await.unwrap();
        assert!(second.upload_date > first.upload_date);
        assert_eq!(second.upload_date.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryFileStore::new("casefile");
        store.create("b", "a.txt", "text/plain", b"1").await.unwrap();
        assert_eq!(store.remove("b", "a.txt").await.unwrap(), 1);
        assert_eq!(store.remove("b", "a.txt").await.unwrap(), 0);
        assert!(store.read("b", "a.txt").await.unwrap().is_none());
    }
}
