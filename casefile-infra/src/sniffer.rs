use casefile_api::ContentSniffer;
use tracing::warn;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";
pub const KML: &str = "application/vnd.google-earth.kml+xml";

/// MagicContentSniffer 根据文件头部的魔数识别内容类型，不参考文件名
#[derive(Debug, Clone, Default)]
pub struct MagicContentSniffer;

impl MagicContentSniffer {
    pub fn new() -> Self {
        Self
    }
}

impl ContentSniffer for MagicContentSniffer {
    fn detect(&self, content: &[u8]) -> String {
        let text = std::str::from_utf8(content)
            .ok()
            .map(|t| t.trim_start_matches('\u{feff}').trim_start());

        if let Some(text) = text {
            if is_kml(text) {
                return KML.to_string();
            }
        }

        if let Some(kind) = infer::get(content) {
            return kind.mime_type().to_string();
        }

        let mime = match text {
            Some("") | None => OCTET_STREAM,
            Some(_) => TEXT_PLAIN,
        };
        warn!(mime, length = content.len(), "No magic number matched, falling back");
        mime.to_string()
    }
}

fn is_kml(text: &str) -> bool {
    let head: String = text.chars().take(512).collect();
    head.starts_with("<kml") || (head.starts_with("<?xml") && head.contains("<kml"))
}
