use std::sync::Arc;

use t3ext_core::audit::{AuditLogger, FsBlobStore};
use t3ext_core::config::{AppConfig, ConfigError, LoadOptions, SourceKind};
use t3ext_core::source::ExtensionSource;
use t3ext_db::{connect, migrations, SqlExtensionStore};
use t3ext_registry::{RegistryClient, RegistryError};
use t3ext_slack::ExtensionCommandHandler;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub handler: Arc<ExtensionCommandHandler>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("store connection failed: {0}")]
    StoreConnect(#[source] sqlx::Error),
    #[error("store schema setup failed: {0}")]
    StoreSchema(#[source] sqlx::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let source = build_source(&config).await?;
    let mut handler = ExtensionCommandHandler::new(
        source,
        config.slack.allow_list(),
        config.links.details_base_url.clone(),
    );
    if let Some(audit) = build_audit(&config) {
        handler = handler.with_audit(audit);
    }

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        source = config.source.kind.as_str(),
        audit_enabled = config.audit.bucket.is_some(),
        "application bootstrap finished"
    );
    Ok(Application { config, handler: Arc::new(handler) })
}

/// Builds the configured data source. The store variant creates its table
/// when it does not exist yet.
pub async fn build_source(config: &AppConfig) -> Result<Arc<dyn ExtensionSource>, BootstrapError> {
    match config.source.kind {
        SourceKind::Store => {
            let store = &config.store;
            let pool = connect(store)
                .await
                .map_err(BootstrapError::StoreConnect)?;
            migrations::run_pending(&pool, &store.table).await.map_err(BootstrapError::StoreSchema)?;
            info!(
                event_name = "system.bootstrap.store_connected",
                correlation_id = "bootstrap",
                table = %store.table,
                "extension store connected"
            );
            Ok(Arc::new(SqlExtensionStore::new(pool, &store.table)))
        }
        SourceKind::Remote => {
            let client = RegistryClient::new(&config.remote)?;
            info!(
                event_name = "system.bootstrap.remote_configured",
                correlation_id = "bootstrap",
                host = %config.remote.host,
                "remote registry client configured"
            );
            Ok(Arc::new(client))
        }
    }
}

pub fn build_audit(config: &AppConfig) -> Option<AuditLogger> {
    let bucket = config.audit.bucket.as_deref()?;
    Some(AuditLogger::new(
        Arc::new(FsBlobStore::new(bucket)),
        bucket,
        config.store.region.clone(),
        config.store.table.clone(),
        config.audit.function_name.clone(),
    ))
}
