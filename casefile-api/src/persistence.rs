use crate::entity::Entity;
use crate::error::Result;
use crate::query::Condition;
use async_trait::async_trait;

/// PersistenceProvider trait 定义底层实体持久化操作
///
/// 按标识符查找不到记录时返回 `Ok(None)`，不返回错误。
#[async_trait]
pub trait PersistenceProvider: Send + Sync {
    /// 插入新实体，标识符未设置时生成并回写
    async fn persist<E: Entity>(&self, entity: &mut E) -> Result<()>;

    /// 用内存中的状态覆盖已存储的实体
    async fn merge<E: Entity>(&self, entity: &E) -> Result<()>;

    /// 删除实体，不存在时返回 `StorageError::NotFound`
    async fn remove<E: Entity>(&self, entity: &E) -> Result<()>;

    async fn find<E: Entity>(&self, id: &E::Id) -> Result<Option<E>>;

    /// 按条件查询同类型实体
    async fn select<E: Entity>(&self, condition: &Condition) -> Result<Vec<E>>;

    /// 按条件删除同类型实体，返回删除数量
    async fn delete_where<E: Entity>(&self, condition: &Condition) -> Result<u64>;

    /// 为实体声明的字段建立索引
    async fn ensure_indexes<E: Entity>(&self) -> Result<()>;

    /// 释放连接
    async fn close(&self) -> Result<()>;
}
