use super::matcher::matches;
use async_trait::async_trait;
use casefile_api::{Condition, Entity, EntityId, PersistenceProvider, Result, StorageError};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

type Collection = IndexMap<String, Value>;

/// MemoryPersistenceProvider 内存实现，集合内保持插入顺序
///
/// 实体以JSON文档保存，主要用于测试和离线运行。
#[derive(Default)]
pub struct MemoryPersistenceProvider {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryPersistenceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 某类实体当前存储的文档数
    pub async fn count<E: Entity>(&self) -> usize {
        let collections = self.collections.read().await;
        collections
            .get(&E::kind().collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }
}

fn storage_key<E: Entity>(id: &E::Id) -> Result<String> {
    Ok(serde_json::to_string(id)?)
}

fn require_id<E: Entity>(entity: &E) -> Result<&E::Id> {
    entity
        .id()
        .ok_or_else(|| StorageError::MissingIdentifier(format!("{} has no identifier", E::kind())))
}

#[async_trait]
impl PersistenceProvider for MemoryPersistenceProvider {
    async fn persist<E: Entity>(&self, entity: &mut E) -> Result<()> {
        if entity.id().is_none() {
            entity.set_id(<E::Id as EntityId>::generate());
        }
        let key = storage_key::<E>(require_id::<E>(entity)?)?;
        let document = serde_json::to_value(&*entity)?;

        let mut collections = self.collections.write().await;
        let collection = collections.entry(E::kind().collection).or_default();
        if collection.contains_key(&key) {
            return Err(StorageError::Duplicate(format!("{} {}", E::kind(), key)));
        }
        collection.insert(key, document);
        debug!(kind = %E::kind(), id = ?entity.id(), "Entity inserted");
        Ok(())
    }

    async fn merge<E: Entity>(&self, entity: &E) -> Result<()> {
        let key = storage_key::<E>(require_id::<E>(entity)?)?;
        let document = serde_json::to_value(entity)?;

        let mut collections = self.collections.write().await;
        collections
            .entry(E::kind().collection)
            .or_default()
            .insert(key, document);
        debug!(kind = %E::kind(), id = ?entity.id(), "Entity merged");
        Ok(())
    }

    async fn remove<E: Entity>(&self, entity: &E) -> Result<()> {
        let key = storage_key::<E>(require_id::<E>(entity)?)?;

        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(&E::kind().collection)
            .and_then(|c| c.shift_remove(&key));
        match removed {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(format!("{} {}", E::kind(), key))),
        }
    }

    async fn find<E: Entity>(&self, id: &E::Id) -> Result<Option<E>> {
        let key = storage_key::<E>(id)?;

        let collections = self.collections.read().await;
        let document = collections
            .get(&E::kind().collection)
            .and_then(|c| c.get(&key))
            .cloned();
        Ok(document.map(serde_json::from_value::<E>).transpose()?)
    }

    async fn select<E: Entity>(&self, condition: &Condition) -> Result<Vec<E>> {
        let collections = self.collections.read().await;
        let Some(collection) = collections.get(&E::kind().collection) else {
            return Ok(Vec::new());
        };
        collection
            .values()
            .filter(|document| matches(condition, document))
            .map(|document| serde_json::from_value::<E>(document.clone()).map_err(StorageError::from))
            .collect()
    }

    async fn delete_where<E: Entity>(&self, condition: &Condition) -> Result<u64> {
        let mut collections = self.collections.write().await;
        let Some(collection) = collections.get_mut(&E::kind().collection) else {
            return Ok(0);
        };
        let before = collection.len();
        collection.retain(|_, document| !matches(condition, document));
        let deleted = (before - collection.len()) as u64;
        debug!(kind = %E::kind(), deleted, "Entities deleted");
        Ok(deleted)
    }

    async fn ensure_indexes<E: Entity>(&self) -> Result<()> {
        debug!(kind = %E::kind(), fields = ?E::indexed_fields(), "Indexes are implicit in memory");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
