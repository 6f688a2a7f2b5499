use casefile_api::StoredFile;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attachment 描述外部存储的文件内容，嵌入在所属实体中
///
/// 创建后不可修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    content_type: String,
    file_name: String,
    /// XML Schema dateTime 格式
    upload_date: String,
    url: String,
}

impl Attachment {
    pub fn new(
        content_type: impl Into<String>,
        file_name: impl Into<String>,
        upload_date: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            file_name: file_name.into(),
            upload_date: upload_date.into(),
            url: url.into(),
        }
    }

    /// 从存储文件构建附件元数据
    pub fn from_stored(
        file: &StoredFile,
        rest_url: &str,
        database_name: &str,
        bucket: &str,
    ) -> Self {
        Self {
            content_type: file.content_type.clone(),
            file_name: file.file_name.clone(),
            upload_date: format_upload_date(&file.upload_date),
            url: attachment_url(rest_url, database_name, bucket, &file.file_name),
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn upload_date(&self) -> &str {
        &self.upload_date
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Attachment{{contentType={}, fileName={}, uploadDate={}, url={}}}",
            self.content_type, self.file_name, self.upload_date, self.url
        )
    }
}

/// 文件访问地址：`{rest_url}/gridfs/{database_name}/{bucket}?filename={file_name}`
///
/// 各部分原样拼接，不做编码。
pub fn attachment_url(rest_url: &str, database_name: &str, bucket: &str, file_name: &str) -> String {
    format!(
        "{}/gridfs/{}/{}?filename={}",
        rest_url, database_name, bucket, file_name
    )
}

/// 上传时间格式化为带时区偏移的日历时间（毫秒精度，UTC）
pub fn format_upload_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, false)
}
