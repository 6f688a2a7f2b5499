use async_trait::async_trait;
use casefile_api::{RemoteFetcher, Result, StorageError};
use reqwest::Url;
use tracing::debug;

/// HttpFetcher 通过HTTP GET下载远程文件
#[derive(Clone, Default)]
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| StorageError::Download(format!("Failed to fetch {}: {}", url, e)))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| StorageError::Download(format!("Failed to read body of {}: {}", url, e)))?;

        debug!(%url, length = body.len(), "Remote file fetched");
        Ok(body.to_vec())
    }
}
