use crate::error::{Result, StorageError};
use async_trait::async_trait;
use reqwest::Url;
use std::path::PathBuf;

/// FileSource 表示附件内容的来源
#[derive(Debug, Clone, PartialEq)]
pub enum FileSource {
    /// 远程地址，先下载到临时文件
    Remote(Url),
    /// 本地文件
    Local(PathBuf),
}

impl FileSource {
    /// 从字符串解析远程地址
    pub fn remote(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| StorageError::InvalidArgument(format!("Invalid url {}: {}", url, e)))?;
        Ok(FileSource::Remote(url))
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        FileSource::Local(path.into())
    }

    /// 存储使用的文件名：远程地址取最后一个非空路径段，本地文件取文件名
    pub fn file_name(&self) -> Result<String> {
        match self {
            FileSource::Remote(url) => url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(|s| s.to_string())
                .ok_or_else(|| {
                    StorageError::InvalidArgument(format!("No file name in url: {}", url))
                }),
            FileSource::Local(path) => path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .ok_or_else(|| {
                    StorageError::InvalidArgument(format!(
                        "No file name in path: {}",
                        path.display()
                    ))
                }),
        }
    }
}

/// RemoteFetcher trait 下载远程文件的完整内容
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

/// ContentSniffer 根据文件字节判断内容类型
pub trait ContentSniffer: Send + Sync {
    fn detect(&self, content: &[u8]) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_file_name() {
        let source = FileSource::remote("http://example.com/wp-content/uploads/mammoth.jpg").unwrap();
        assert_eq!(source.file_name().unwrap(), "mammoth.jpg");
    }

    #[test]
    fn test_remote_file_name_ignores_query() {
        let source = FileSource::remote("https://example.com/kml/KML_Samples.kml?v=2#top").unwrap();
        assert_eq!(source.file_name().unwrap(), "KML_Samples.kml");
    }

    #[test]
    fn test_remote_file_name_trailing_slash() {
        let source = FileSource::remote("https://example.com/files/report.pdf/").unwrap();
        assert_eq!(source.file_name().unwrap(), "report.pdf");
    }

    #[test]
    fn test_remote_without_path() {
        let source = FileSource::remote("https://example.com/").unwrap();
        assert!(matches!(source.file_name(), Err(StorageError::InvalidArgument(_))));
    }

    #[test]
    fn test_invalid_remote() {
        assert!(matches!(FileSource::remote("not a url"), Err(StorageError::InvalidArgument(_))));
    }

    #[test]
    fn test_local_file_name() {
        let source = FileSource::local("/tmp/data/a.jpg");
        assert_eq!(source.file_name().unwrap(), "a.jpg");
    }
}
