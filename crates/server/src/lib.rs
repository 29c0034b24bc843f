//! HTTP surface for the `/extension` slash command.

pub mod app;
pub mod bootstrap;
pub mod health;
pub mod logging;

use anyhow::Result;
use t3ext_core::config::{AppConfig, LoadOptions};

pub use app::router;
pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use logging::init_logging;

/// Loads configuration, installs logging and builds the application.
pub async fn prepare() -> Result<Application> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config.logging);
    Ok(bootstrap_with_config(config).await?)
}

/// Serves the router over TCP until Ctrl-C.
pub async fn serve(app: Application) -> Result<()> {
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        source = app.handler.source_name(),
        "t3ext-server listening"
    );
    axum::serve(listener, router(app.handler)).with_graceful_shutdown(wait_for_shutdown()).await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "t3ext-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(
            event_name = "system.server.signal_failed",
            error = %error,
            "could not listen for ctrl-c; shutting down"
        );
    }
}
