use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use t3ext_core::config::StoreConfig;

pub type DbPool = sqlx::SqlitePool;

/// A writer waits this long on a locked database file before failing.
const BUSY_TIMEOUT_PRAGMA: &str = "PRAGMA busy_timeout = 5000";

/// Opens the pool described by the `[store]` config section.
pub async fn connect(store: &StoreConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&store.url, store.max_connections, store.timeout_secs).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query(BUSY_TIMEOUT_PRAGMA).execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}
