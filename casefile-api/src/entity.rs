use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// 实体标识符在存储文档中的字段名
pub const ID_FIELD: &str = "_id";

/// EntityKind 表示实体的类型名称和存储集合
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKind {
    /// 查询语句中使用的类型名（如 `SELECT e FROM GenericCase e`）
    pub name: String,
    /// 存储集合名称
    pub collection: String,
}

impl EntityKind {
    pub fn new(name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
        }
    }

    /// 生成选择该类型全部记录的查询语句
    pub fn select_all_query(&self) -> String {
        format!("SELECT e FROM {} e", self.name)
    }

    /// 生成删除该类型全部记录的查询语句
    pub fn delete_all_query(&self) -> String {
        format!("DELETE FROM {}", self.name)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// EntityId 标识符能力：未设置时由持久化提供者生成新值
pub trait EntityId:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn generate() -> Self;
}

impl EntityId for String {
    fn generate() -> Self {
        uuid::Uuid::new_v4().to_string()
    }
}

impl EntityId for uuid::Uuid {
    fn generate() -> Self {
        uuid::Uuid::new_v4()
    }
}

/// Entity trait 是所有可持久化实体的基础trait
///
/// 实体以 `_id` 字段序列化标识符，未设置时省略该字段。
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    type Id: EntityId;

    fn kind() -> EntityKind;

    /// 标识符，`None` 表示尚未分配
    fn id(&self) -> Option<&Self::Id>;

    fn set_id(&mut self, id: Self::Id);

    /// 需要建立二级索引的字段
    fn indexed_fields() -> &'static [&'static str] {
        &[]
    }
}
