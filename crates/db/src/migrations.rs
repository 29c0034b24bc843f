//! Schema for the extension table.
//!
//! The table name is deployment configuration, so the statement is rendered at
//! runtime instead of living in a static migrations directory. Callers pass a
//! name that `AppConfig::validate` has already restricted to a plain identifier.

use crate::DbPool;

pub fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            extension_key TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            version TEXT NOT NULL DEFAULT '',
            author_name TEXT,
            last_updated TEXT,
            description TEXT NOT NULL DEFAULT ''
        )"
    )
}

pub async fn run_pending(pool: &DbPool, table: &str) -> Result<(), sqlx::Error> {
    sqlx::query(&create_table_sql(table)).execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::run_pending;
    use crate::connect_with_settings;

    #[tokio::test]
    async fn run_pending_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");

        run_pending(&pool, "extension").await.expect("first run");
        run_pending(&pool, "extension").await.expect("second run");

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'extension'",
        )
        .fetch_one(&pool)
        .await
        .expect("schema query");
        assert_eq!(count, 1);

        pool.close().await;
    }
}
