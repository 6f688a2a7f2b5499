use casefile_api::DataSourceConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub datasource: DataSourceConfig,
    pub demo: DemoConfig,
}

/// 示例流程使用的附件来源
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub image_url: String,
    pub kml_url: String,
    pub overwrite: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            image_url: "http://mammoth-holiday.com/wp-content/uploads/2013/05/mammoth.jpg".to_string(),
            kml_url: "https://developers.google.com/kml/documentation/KML_Samples.kml".to_string(),
            overwrite: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let config_path = home_dir.join(".casefile").join("casefile.toml");

        // .env 中的变量先进入进程环境，再由 Environment 源读取
        dotenv::dotenv().ok();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("casefile.toml").required(false))
            .add_source(config::File::from(config_path.as_path()).required(false))
            .add_source(config::Environment::with_prefix("CASEFILE").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn from_toml(content: &str) -> Config {
        config::Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("");
        assert_eq!(config.datasource, DataSourceConfig::default());
        assert_eq!(config.datasource.host_port, 27017);
        assert_eq!(config.datasource.rest_url, "http://localhost:8080/api");
        assert!(config.demo.overwrite);
    }

    #[test]
    fn test_partial_override() {
        let config = from_toml(
            r#"
            [datasource]
            host_name = "mongo.internal"
            database_name = "cases"

            [demo]
            overwrite = false
            "#,
        );
        assert_eq!(config.datasource.host_name, "mongo.internal");
        assert_eq!(config.datasource.host_port, 27017);
        assert_eq!(config.datasource.database_name, "cases");
        assert_eq!(config.datasource.mongodb_uri(), "mongodb://mongo.internal:27017");
        assert!(!config.demo.overwrite);
        assert!(config.demo.image_url.ends_with("mammoth.jpg"));
    }
}
