use serde::{Deserialize, Serialize};

/// DataSourceConfig 数据源连接信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceConfig {
    pub host_name: String,
    pub host_port: u16,
    pub database_name: String,
    /// 文件访问REST服务的基础地址
    pub rest_url: String,
}

impl DataSourceConfig {
    /// MongoDB连接串
    pub fn mongodb_uri(&self) -> String {
        format!("mongodb://{}:{}", self.host_name, self.host_port)
    }
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            host_name: "localhost".to_string(),
            host_port: 27017,
            database_name: "casefile".to_string(),
            rest_url: "http://localhost:8080/api".to_string(),
        }
    }
}
