
use async_trait::async_trait;
use casefile_api::{
    DataSourceConfig, Entity, Parameters, ParsedQuery, PersistenceProvider, Result, Statement,
    StorageError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// EntityDao trait 定义通用实体的数据访问操作
#[async_trait]
pub trait EntityDao: Send + Sync {
    fn host_name(&self) -> &str;

    fn host_port(&self) -> u16;

    fn database_name(&self) -> &str;

    fn rest_url(&self) -> &str;

    /// 作为新实体插入，标识符未设置时由提供者分配
    async fn save<E: Entity>(&self, entity: &mut E) -> Result<()>;

    /// 用内存状态覆盖已存储的实体
    async fn update<E: Entity>(&self, entity: &E) -> Result<()>;

    async fn remove<E: Entity>(&self, entity: &E) -> Result<()>;

    /// 实体不存在时插入，已存在时更新
    async fn save_or_update<E: Entity>(&self, entity: &mut E) -> Result<()>;

    async fn find_all<E: Entity>(&self) -> Result<Vec<E>>;

    async fn find_by_id<E: Entity>(&self, id: &E::Id) -> Result<Option<E>>;

    async fn find_by_query<E: Entity>(&self, query: &str) -> Result<Vec<E>>;

    /// 使用单个命名参数查询
    async fn find_by_query_with_param<E: Entity>(
        &self,
        query: &str,
        parameter: &str,
        value: serde_json::Value,
    ) -> Result<Vec<E>>;

    async fn remove_by_id<E: Entity>(&self, id: &E::Id) -> Result<()>;

    /// 删除某类型的全部实体，返回删除数量
    async fn remove_all<E: Entity>(&self) -> Result<u64>;

    async fn ensure_indexes<E: Entity>(&self) -> Result<()>;

    /// 释放连接，之后的任何操作都返回 `StorageError::Closed`
    async fn shut_down(&self) -> Result<()>;
}

/// SimpleEntityDao 直接委托给持久化提供者的DAO实现
pub struct SimpleEntityDao<P: PersistenceProvider + 'static> {
    provider: Arc<P>,
    datasource: DataSourceConfig,
    closed: AtomicBool,
}

impl<P: PersistenceProvider + 'static> SimpleEntityDao<P> {
    pub fn new(provider: Arc<P>, datasource: DataSourceConfig) -> Self {
        Self {
            provider,
            datasource,
            closed: AtomicBool::new(false),
        }
    }

    pub fn provider(&self) -> Arc<P> {
        self.provider.clone()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed("entity dao has been shut down".to_string()));
        }
        Ok(())
    }

    fn parse<E: Entity>(query: &str, params: &Parameters, statement: Statement) -> Result<ParsedQuery> {
        let parsed = ParsedQuery::parse(query, params)?;
        parsed.expect_statement(statement)?;
        parsed.expect_kind(&E::kind())?;
        Ok(parsed)
    }

    async fn select<E: Entity>(&self, query: &str, params: &Parameters) -> Result<Vec<E>> {
        self.ensure_open()?;
        let parsed = Self::parse::<E>(query, params, Statement::Select)?;
        self.provider.select(&parsed.condition).await
    }
}

#[async_trait]
impl<P: PersistenceProvider + 'static> EntityDao for SimpleEntityDao<P> {
    fn host_name(&self) -> &str {
        &self.datasource.host_name
    }

    fn host_port(&self) -> u16 {
        self.datasource.host_port
    }

    fn database_name(&self) -> &str {
        &self.datasource.database_name
    }

    fn rest_url(&self) -> &str {
        &self.datasource.rest_url
    }

    async fn save<E: Entity>(&self, entity: &mut E) -> Result<()> {
        self.ensure_open()?;
        self.provider.persist(entity).await
    }

    async fn update<E: Entity>(&self, entity: &E) -> Result<()> {
        self.ensure_open()?;
        self.provider.merge(entity).await
    }

    async fn remove<E: Entity>(&self, entity: &E) -> Result<()> {
        self.ensure_open()?;
        self.provider.remove(entity).await
    }

    async fn save_or_update<E: Entity>(&self, entity: &mut E) -> Result<()> {
        // 标识符未设置时不能查找，直接插入
        let Some(id) = entity.id().cloned() else {
            debug!(kind = %E::kind(), "No identifier, saving as new");
            return self.save(entity).await;
        };

        // 查找失败的错误直接返回，不当作不存在处理
        match self.find_by_id::<E>(&id).await? {
            None => {
                debug!(kind = %E::kind(), ?id, "Identifier not stored yet, saving");
                self.save(entity).await
            }
            Some(_) => {
                debug!(kind = %E::kind(), ?id, "Existing entity, updating");
                self.update(entity).await
            }
        }
    }

    async fn find_all<E: Entity>(&self) -> Result<Vec<E>> {
        let query = E::kind().select_all_query();
        self.find_by_query(&query).await
    }

    async fn find_by_id<E: Entity>(&self, id: &E::Id) -> Result<Option<E>> {
        self.ensure_open()?;
        self.provider.find(id).await
    }

    async fn find_by_query<E: Entity>(&self, query: &str) -> Result<Vec<E>> {
        self.select(query, &Parameters::new()).await
    }

    async fn find_by_query_with_param<E: Entity>(
        &self,
        query: &str,
        parameter: &str,
        value: serde_json::Value,
    ) -> Result<Vec<E>> {
        let mut params = Parameters::new();
        params.insert(parameter.trim_start_matches(':').to_string(), value);
        self.select(query, &params).await
    }

    async fn remove_by_id<E: Entity>(&self, id: &E::Id) -> Result<()> {
        let entity = self
            .find_by_id::<E>(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("{} {:?}", E::kind(), id)))?;
        self.remove(&entity).await
    }

    async fn remove_all<E: Entity>(&self) -> Result<u64> {
        self.ensure_open()?;
        let query = E::kind().delete_all_query();
        let parsed = Self::parse::<E>(&query, &Parameters::new(), Statement::Delete)?;
        self.provider.delete_where::<E>(&parsed.condition).await
    }

    async fn ensure_indexes<E: Entity>(&self) -> Result<()> {
        self.ensure_open()?;
        self.provider.ensure_indexes::<E>().await
    }

    async fn shut_down(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StorageError::Closed("entity dao has already been shut down".to_string()));
        }
        self.provider.close().await?;
        info!(database = %self.datasource.database_name, "Entity dao shut down");
        Ok(())
    }
}
