use casefile_api::{RemoteFetcher, Result};
use reqwest::Url;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// TransientFile 远程文件下载后的本地副本
///
/// 文件位于独占的临时目录中，值被丢弃时目录连同文件一起删除。
pub struct TransientFile {
    path: PathBuf,
    _dir: TempDir,
}

impl TransientFile {
    /// 下载远程内容，以 `file_name` 命名写入临时目录
    pub async fn download(fetcher: &dyn RemoteFetcher, url: &Url, file_name: &str) -> Result<Self> {
        // 先下载再建目录，下载失败时不留下任何本地文件
        let content = fetcher.fetch(url).await?;

        let dir = tempfile::Builder::new().prefix("casefile-").tempdir()?;
        let path = dir.path().join(file_name);
        tokio::fs::write(&path, &content).await?;
        debug!(%url, path = %path.display(), length = content.len(), "Remote file downloaded");

        Ok(Self { path, _dir: dir })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
