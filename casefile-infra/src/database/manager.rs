use super::error::map_mongo_error;
use casefile_api::{DataSourceConfig, Result};
use mongodb::bson::doc;
use mongodb::{Client as MongoClient, Database};
use std::sync::Arc;
use tracing::info;

/// DatabaseManager 管理一个MongoDB连接
///
/// 连接在进程内长期存在，由 `shutdown` 显式释放。
#[derive(Clone)]
pub struct DatabaseManager {
    mongodb: Arc<MongoClient>,
    database_name: String,
}

impl DatabaseManager {
    /// 按数据源配置建立连接，并通过ping确认服务可达
    pub async fn connect(config: &DataSourceConfig) -> Result<Self> {
        let client = MongoClient::with_uri_str(config.mongodb_uri())
            .await
            .map_err(map_mongo_error)?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(map_mongo_error)?;

        info!(
            host = %config.host_name,
            port = config.host_port,
            database = %config.database_name,
            "MongoDB connection established"
        );

        Ok(Self {
            mongodb: Arc::new(client),
            database_name: config.database_name.clone(),
        })
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// 获取配置的数据库
    pub fn database(&self) -> Database {
        self.mongodb.database(&self.database_name)
    }

    /// 关闭连接
    pub async fn shutdown(&self) {
        self.mongodb.as_ref().clone().shutdown().await;
        info!(database = %self.database_name, "MongoDB connection closed");
    }
}
