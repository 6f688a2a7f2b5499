mod config;
mod error;

use casefile_api::FileSource;
use casefile_domain::GenericCase;
use casefile_infra::{
    DatabaseManager, GridFsFileStore, HttpFetcher, MagicContentSniffer, MongoPersistenceProvider,
};
use casefile_service::{AttachmentService, EntityDao, GridFsAttachmentService, SimpleEntityDao};
use crate::config::{Config, DemoConfig};
use crate::error::{CasefileError, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| CasefileError::Internal(format!("Failed to set tracing subscriber: {}", e)))?;

    info!("Starting casefile...");

    // 加载配置
    let config = Config::load()?;
    info!("Configuration loaded successfully");

    if let Err(e) = run(&config).await {
        error!(error = %e, "An error occurred.");
        return Err(e);
    }
    Ok(())
}

async fn run(config: &Config) -> Result<()> {
    let datasource = &config.datasource;

    // 实体和文件存储各自持有连接
    let dao_manager = Arc::new(DatabaseManager::connect(datasource).await?);
    let gridfs_manager = Arc::new(DatabaseManager::connect(datasource).await?);

    let dao = SimpleEntityDao::new(
        Arc::new(MongoPersistenceProvider::new(dao_manager)),
        datasource.clone(),
    );
    let attachments = GridFsAttachmentService::new(
        Arc::new(GridFsFileStore::new(gridfs_manager)),
        Arc::new(MagicContentSniffer::new()),
        Arc::new(HttpFetcher::new()),
        dao.rest_url(),
    );

    drive(&config.demo, &dao, &attachments).await
}

/// 执行示例流程，无论成功与否都释放两个组件，返回最先出现的错误
async fn drive<D: EntityDao, A: AttachmentService>(
    demo: &DemoConfig,
    dao: &D,
    attachments: &A,
) -> Result<()> {
    let outcome = populate(demo, dao, attachments).await;
    let released = release(dao, attachments).await;
    if let (Err(_), Err(e)) = (&outcome, &released) {
        warn!(error = %e, "Failed to release storage after an error");
    }
    outcome.and(released)
}

async fn populate<D: EntityDao, A: AttachmentService>(
    demo: &DemoConfig,
    dao: &D,
    attachments: &A,
) -> Result<()> {
    dao.ensure_indexes::<GenericCase>().await?;

    let mut first = GenericCase::with_id("CASE-0001");
    first.set_status("NEW");
    first.set_case_type("UNKNOWN");

    let mut second = GenericCase::with_id("CASE-0002");
    second.set_status("ONGOING");
    second.set_case_type("UNKNOWN");

    let image = attachments
        .add_file(FileSource::remote(&demo.image_url)?, "image", demo.overwrite)
        .await?;
    info!(attachment = %image, "Attachment created");
    first.add_attachment(image);

    let kml = attachments
        .add_file(FileSource::remote(&demo.kml_url)?, "kml", demo.overwrite)
        .await?;
    info!(attachment = %kml, "Attachment created");
    second.add_attachment(kml);

    dao.save_or_update(&mut first).await?;
    dao.save_or_update(&mut second).await?;

    let cases = dao.find_all::<GenericCase>().await?;
    info!(count = cases.len(), "Cases stored");
    Ok(())
}

/// 先关闭文件存储再关闭实体存储，两者都会尝试
async fn release<D: EntityDao, A: AttachmentService>(dao: &D, attachments: &A) -> Result<()> {
    let files = attachments.shutdown().await;
    let entities = dao.shut_down().await;
    files?;
    entities?;
    Ok(())
}
