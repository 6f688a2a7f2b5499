use super::filter::condition_to_filter;
use crate::database::{map_mongo_error, DatabaseManager};
use async_trait::async_trait;
use casefile_api::{
    Condition, Entity, EntityId, PersistenceProvider, Result, StorageError, ID_FIELD,
};
use futures_util::TryStreamExt;
use mongodb::bson::{self, Document};
use mongodb::{Collection, IndexModel};
use std::sync::Arc;
use tracing::debug;

/// MongoPersistenceProvider 使用MongoDB实现的持久化提供者
///
/// 每种实体类型对应一个集合，文档即实体的BSON序列化结果。
pub struct MongoPersistenceProvider {
    manager: Arc<DatabaseManager>,
}

impl MongoPersistenceProvider {
    pub fn new(manager: Arc<DatabaseManager>) -> Self {
        Self { manager }
    }

    fn collection<E: Entity>(&self) -> Collection<Document> {
        self.manager.database().collection(&E::kind().collection)
    }
}

fn to_document<E: Entity>(entity: &E) -> Result<Document> {
    bson::to_document(entity).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn from_document<E: Entity>(document: Document) -> Result<E> {
    bson::from_document(document).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn id_filter<E: Entity>(id: &E::Id) -> Result<Document> {
    let id = bson::to_bson(id).map_err(|e| StorageError::Serialization(e.to_string()))?;
    let mut filter = Document::new();
    filter.insert(ID_FIELD, id);
    Ok(filter)
}

fn require_id<E: Entity>(entity: &E) -> Result<&E::Id> {
    entity
        .id()
        .ok_or_else(|| StorageError::MissingIdentifier(format!("{} has no identifier", E::kind())))
}

#[async_trait]
impl PersistenceProvider for MongoPersistenceProvider {
    async fn persist<E: Entity>(&self, entity: &mut E) -> Result<()> {
        if entity.id().is_none() {
            entity.set_id(<E::Id as EntityId>::generate());
        }
        let document = to_document::<E>(entity)?;
        self.collection::<E>()
            .insert_one(document)
            .await
            .map_err(map_mongo_error)?;
        debug!(kind = %E::kind(), id = ?entity.id(), "Entity inserted");
        Ok(())
    }

    async fn merge<E: Entity>(&self, entity: &E) -> Result<()> {
        let filter = id_filter::<E>(require_id(entity)?)?;
        let document = to_document::<E>(entity)?;
        self.collection::<E>()
            .replace_one(filter, document)
            .upsert(true)
            .await
            .map_err(map_mongo_error)?;
        debug!(kind = %E::kind(), id = ?entity.id(), "Entity merged");
        Ok(())
    }

    async fn remove<E: Entity>(&self, entity: &E) -> Result<()> {
        let id = require_id(entity)?;
        let result = self
            .collection::<E>()
            .delete_one(id_filter::<E>(id)?)
            .await
            .map_err(map_mongo_error)?;
        if result.deleted_count == 0 {
            return Err(StorageError::NotFound(format!("{} {:?}", E::kind(), id)));
        }
        Ok(())
    }

    async fn find<E: Entity>(&self, id: &E::Id) -> Result<Option<E>> {
        let document = self
            .collection::<E>()
            .find_one(id_filter::<E>(id)?)
            .await
            .map_err(map_mongo_error)?;
        document.map(from_document::<E>).transpose()
    }

    async fn select<E: Entity>(&self, condition: &Condition) -> Result<Vec<E>> {
        let filter = condition_to_filter(condition)?;
        let cursor = self
            .collection::<E>()
            .find(filter)
            .await
            .map_err(map_mongo_error)?;
        let documents: Vec<Document> = cursor.try_collect().await.map_err(map_mongo_error)?;
        documents.into_iter().map(from_document::<E>).collect()
    }

    async fn delete_where<E: Entity>(&self, condition: &Condition) -> Result<u64> {
        let filter = condition_to_filter(condition)?;
        let result = self
            .collection::<E>()
            .delete_many(filter)
            .await
            .map_err(map_mongo_error)?;
        debug!(kind = %E::kind(), deleted = result.deleted_count, "Entities deleted");
        Ok(result.deleted_count)
    }

    async fn ensure_indexes<E: Entity>(&self) -> Result<()> {
        let collection = self.collection::<E>();
        for field in E::indexed_fields() {
            let mut keys = Document::new();
            keys.insert(*field, 1_i32);
            collection
                .create_index(IndexModel::builder().keys(keys).build())
                .await
                .map_err(map_mongo_error)?;
        }
        debug!(kind = %E::kind(), fields = ?E::indexed_fields(), "Indexes ensured");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.manager.shutdown().await;
        Ok(())
    }
}
