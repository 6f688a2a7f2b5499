use super::*;
use casefile_infra::{MagicContentSniffer, MemoryFileStore};
use chrono::{DateTime, FixedOffset};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Mutex;

const REST_URL: &str = "http://localhost:8080/api";
const IMAGE_URL: &str = "http://www.example.com/wp-content/uploads/2013/05/mammoth.jpg";
const KML_URL: &str = "https://developers.example.com/kml/documentation/KML_Samples.kml";

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01];
const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D];
const KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2"><Document><name>KML Samples</name></Document></kml>"#;

/// 按地址返回固定内容的下载器，可在测试中替换内容
#[derive(Default)]
struct StubFetcher {
    responses: Mutex<HashMap<String, Vec<u8>>>,
}

impl StubFetcher {
    fn with(url: &str, content: &[u8]) -> Self {
        let fetcher = Self::default();
        fetcher.respond(url, content);
        fetcher
    }

    fn respond(&self, url: &str, content: &[u8]) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), content.to_vec());
    }
}

#[async_trait]
impl RemoteFetcher for StubFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        self.responses
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| StorageError::Download(format!("{} returned 404 Not Found", url)))
    }
}

struct Fixture {
    store: Arc<MemoryFileStore>,
    fetcher: Arc<StubFetcher>,
    service: GridFsAttachmentService,
}

fn fixture(fetcher: StubFetcher) -> Fixture {
    let store = Arc::new(MemoryFileStore::new("casefile"));
    let fetcher = Arc::new(fetcher);
    let service = GridFsAttachmentService::new(
        store.clone(),
        Arc::new(MagicContentSniffer::new()),
        fetcher.clone(),
        REST_URL,
    );
    Fixture {
        store,
        fetcher,
        service,
    }
}

fn parse_date(attachment: &Attachment) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(attachment.upload_date()).unwrap()
}

#[tokio::test]
async fn test_add_remote_file() {
    let f = fixture(StubFetcher::with(IMAGE_URL, JPEG));

    let attachment = f
        .service
        .add_file(FileSource::remote(IMAGE_URL).unwrap(), "image", false)
        .await
        .unwrap();

    assert_eq!(attachment.file_name(), "mammoth.jpg");
    assert_eq!(attachment.content_type(), "image/jpeg");
    assert_eq!(
        attachment.url(),
        "http://localhost:8080/api/gridfs/casefile/image?filename=mammoth.jpg"
    );
    let stored = f.store.find_one("image", "mammoth.jpg").await.unwrap().unwrap();
    assert_eq!(parse_date(&attachment).timestamp_millis(), stored.upload_date.timestamp_millis());
    assert_eq!(f.store.read("image", "mammoth.jpg").await.unwrap().unwrap(), JPEG);
}

#[tokio::test]
async fn test_existing_file_kept_without_overwrite() {
    let f = fixture(StubFetcher::with(IMAGE_URL, JPEG));
    let source = FileSource::remote(IMAGE_URL).unwrap();
    let first = f.service.add_file(source.clone(), "image", false).await.unwrap();

    // 远程内容变化后再次添加
    f.fetcher.respond(IMAGE_URL, PNG);
    let second = f.service.add_file(source, "image", false).await.unwrap();

    assert_eq!(second, first);
    assert_eq!(second.content_type(), "image/jpeg");
    assert_eq!(f.store.read("image", "mammoth.jpg").await.unwrap().unwrap(), JPEG);
}

#[tokio::test]
async fn test_existing_file_replaced_with_overwrite() {
    let f = fixture(StubFetcher::with(IMAGE_URL, JPEG));
    let source = FileSource::remote(IMAGE_URL).unwrap();
    let first = f.service.add_file(source.clone(), "image", true).await.unwrap();

    f.fetcher.respond(IMAGE_URL, PNG);
    let second = f.service.add_file(source, "image", true).await.unwrap();

    assert_eq!(second.content_type(), "image/png");
    assert_eq!(second.url(), first.url());
    assert!(parse_date(&second) > parse_date(&first));
    assert_eq!(f.store.read("image", "mammoth.jpg").await.unwrap().unwrap(), PNG);
}

#[tokio::test]
async fn test_same_name_in_other_bucket_is_independent() {
    let f = fixture(StubFetcher::with(IMAGE_URL, JPEG));
    let source = FileSource::remote(IMAGE_URL).unwrap();
    f.service.add_file(source.clone(), "image", false).await.unwrap();

    let other = f.service.add_file(source, "thumbnails", false).await.unwrap();
    assert_eq!(
        other.url(),
        "http://localhost:8080/api/gridfs/casefile/thumbnails?filename=mammoth.jpg"
    );
    assert!(f.store.find_one("thumbnails", "mammoth.jpg").await.unwrap().is_some());
}

#[tokio::test]
async fn test_stored_content_type_matches_sniffed_bytes() {
    let f = fixture(StubFetcher::with(KML_URL, KML.as_bytes()));

    let attachment = f
        .service
        .add_file(FileSource::remote(KML_URL).unwrap(), "kml", true)
        .await
        .unwrap();

    let stored = f.store.find_one("kml", "KML_Samples.kml").await.unwrap().unwrap();
    let expected = MagicContentSniffer::new().detect(KML.as_bytes());
    assert_eq!(stored.content_type, expected);
    assert_eq!(attachment.content_type(), expected);
    assert_eq!(expected, "application/vnd.google-earth.kml+xml");
}

#[tokio::test]
async fn test_add_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "witness statement").unwrap();
    let f = fixture(StubFetcher::default());

    let attachment = f
        .service
        .add_file(FileSource::local(&path), "documents", false)
        .await
        .unwrap();

    assert_eq!(attachment.file_name(), "notes.txt");
    assert_eq!(attachment.content_type(), "text/plain");
    assert!(path.exists());
}

#[tokio::test]
async fn test_missing_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let f = fixture(StubFetcher::default());

    let result = f
        .service
        .add_file(FileSource::local(dir.path().join("missing.pdf")), "documents", false)
        .await;
    assert!(matches!(result, Err(StorageError::Io(_))));
}

#[tokio::test]
async fn test_download_failure() {
    let f = fixture(StubFetcher::default());

    let result = f
        .service
        .add_file(FileSource::remote(IMAGE_URL).unwrap(), "image", false)
        .await;

    assert!(matches!(result, Err(StorageError::Download(_))));
    assert!(f.store.find_one("image", "mammoth.jpg").await.unwrap().is_none());
}

#[tokio::test]
async fn test_empty_bucket_rejected() {
    let f = fixture(StubFetcher::with(IMAGE_URL, JPEG));
    let result = f
        .service
        .add_file(FileSource::remote(IMAGE_URL).unwrap(), "", false)
        .await;
    assert!(matches!(result, Err(StorageError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_transient_file_removed_on_drop() {
    let fetcher = StubFetcher::with(IMAGE_URL, JPEG);
    let url = Url::parse(IMAGE_URL).unwrap();

    let transient = TransientFile::download(&fetcher, &url, "mammoth.jpg").await.unwrap();
    let path = transient.path().to_path_buf();
    assert_eq!(path.file_name().unwrap(), "mammoth.jpg");
    assert_eq!(std::fs::read(&path).unwrap(), JPEG);

    drop(transient);
    assert!(!path.exists());
    assert!(!path.parent().unwrap().exists());
}

#[tokio::test]
async fn test_remove_file() {
    let f = fixture(StubFetcher::with(IMAGE_URL, JPEG));
    f.service
        .add_file(FileSource::remote(IMAGE_URL).unwrap(), "image", false)
        .await
        .unwrap();

    assert_eq!(f.service.remove_file("mammoth.jpg", "image").await.unwrap(), 1);
    assert_eq!(f.service.remove_file("mammoth.jpg", "image").await.unwrap(), 0);
    assert!(f.store.find_one("image", "mammoth.jpg").await.unwrap().is_none());
}

#[tokio::test]
async fn test_operations_fail_after_shutdown() {
    let f = fixture(StubFetcher::with(IMAGE_URL, JPEG));
    f.service.shutdown().await.unwrap();

    let result = f
        .service
        .add_file(FileSource::remote(IMAGE_URL).unwrap(), "image", false)
        .await;
    assert!(matches!(result, Err(StorageError::Closed(_))));
    assert!(matches!(
        f.service.remove_file("mammoth.jpg", "image").await,
        Err(StorageError::Closed(_))
    ));
    assert!(matches!(f.service.shutdown().await, Err(StorageError::Closed(_))));
}
