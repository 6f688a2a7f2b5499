use crate::attachment::Attachment;
use casefile_api::{Entity, EntityKind};
use serde::{Deserialize, Serialize};

/// GenericCase 示例业务实体，存储在 `case` 集合中
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericCase {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,

    #[serde(rename = "type", default)]
    case_type: Option<String>,

    #[serde(default)]
    status: Option<String>,

    #[serde(default)]
    attachments: Vec<Attachment>,
}

impl GenericCase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn case_type(&self) -> Option<&str> {
        self.case_type.as_deref()
    }

    pub fn set_case_type(&mut self, case_type: impl Into<String>) {
        self.case_type = Some(case_type.into());
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// 追加附件，保持插入顺序
    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}

impl Entity for GenericCase {
    type Id = String;

    fn kind() -> EntityKind {
        EntityKind::new("GenericCase", "case")
    }

    fn id(&self) -> Option<&String> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn indexed_fields() -> &'static [&'static str] {
        &["type", "status"]
    }
}
