use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, warn};

use t3ext_core::domain::extension::{Author, ExtensionKey, ExtensionRecord};
use t3ext_core::source::{ExtensionSource, LookupOutcome, SourceError};

use super::RepositoryError;
use crate::DbPool;

/// Point reads against the key-value extension table, keyed by `extension_key`.
pub struct SqlExtensionStore {
    pool: DbPool,
    select_sql: String,
    upsert_sql: String,
}

impl SqlExtensionStore {
    /// `table` must already be a validated plain identifier.
    pub fn new(pool: DbPool, table: &str) -> Self {
        let select_sql = format!(
            "SELECT extension_key, title, version, author_name, last_updated, description
             FROM {table} WHERE extension_key = ?"
        );
        let upsert_sql = format!(
            "INSERT INTO {table} (extension_key, title, version, author_name, last_updated, description)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(extension_key) DO UPDATE SET
                title = excluded.title,
                version = excluded.version,
                author_name = excluded.author_name,
                last_updated = excluded.last_updated,
                description = excluded.description"
        );
        Self { pool, select_sql, upsert_sql }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn find(&self, key: &str) -> Result<Option<ExtensionRecord>, RepositoryError> {
        let row = sqlx::query(&self.select_sql).bind(key).fetch_optional(&self.pool).await?;
        row.map(|row| decode_row(&row)).transpose()
    }

    pub async fn upsert(&self, record: &ExtensionRecord) -> Result<(), RepositoryError> {
        let author_name = record.author.as_ref().map(|author| author.name.as_str());
        let last_updated = record.last_updated.map(|seconds| seconds.to_string());
        sqlx::query(&self.upsert_sql)
            .bind(&record.key)
            .bind(&record.title)
            .bind(&record.version)
            .bind(author_name)
            .bind(last_updated)
            .bind(&record.description)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn decode_row(row: &SqliteRow) -> Result<ExtensionRecord, RepositoryError> {
    let get_text = |column: &str| -> Result<Option<String>, RepositoryError> {
        row.try_get::<Option<String>, _>(column)
            .map_err(|error| RepositoryError::Decode(format!("column `{column}`: {error}")))
    };

    let key = get_text("extension_key")?.unwrap_or_default();
    let last_updated = get_text("last_updated")?.and_then(|raw| {
        let parsed = raw.trim().parse::<i64>().ok();
        if parsed.is_none() {
            warn!(extension_key = %key, last_updated = %raw, "ignoring non-numeric last_updated");
        }
        parsed
    });
    let author = get_text("author_name")?
        .filter(|name| !name.trim().is_empty())
        .map(|name| Author { name, email: None });

    Ok(ExtensionRecord {
        title: get_text("title")?.unwrap_or_default(),
        version: get_text("version")?.unwrap_or_default(),
        author,
        last_updated,
        description: get_text("description")?.unwrap_or_default(),
        key,
        ..ExtensionRecord::default()
    })
}

#[async_trait::async_trait]
impl ExtensionSource for SqlExtensionStore {
    fn name(&self) -> &'static str {
        "store"
    }

    async fn lookup(&self, key: &ExtensionKey) -> Result<LookupOutcome, SourceError> {
        let found = self.find(key.as_str()).await?;
        debug!(
            event_name = "source.lookup.store",
            extension_key = %key,
            found = found.is_some(),
            "store point read completed"
        );
        Ok(found.map_or(LookupOutcome::NotFound, LookupOutcome::Found))
    }

    async fn ready(&self) -> Result<(), SourceError> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(|error| SourceError::Unavailable(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use t3ext_core::domain::extension::{Author, ExtensionKey, ExtensionRecord};
    use t3ext_core::source::{ExtensionSource, LookupOutcome, SourceError};

    use super::SqlExtensionStore;
    use crate::{connect_with_settings, migrations};

    async fn store() -> SqlExtensionStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        migrations::run_pending(&pool, "extension").await.expect("schema");
        SqlExtensionStore::new(pool, "extension")
    }

    fn powermail() -> ExtensionRecord {
        ExtensionRecord {
            key: "powermail".to_owned(),
            title: "Powermail".to_owned(),
            version: "10.9.1".to_owned(),
            author: Some(Author { name: "in2code".to_owned(), email: None }),
            last_updated: Some(1_700_000_000),
            description: "Powerful and easy mailform extension".to_owned(),
            ..ExtensionRecord::default()
        }
    }

    #[tokio::test]
    async fn lookup_returns_stored_record() {
        let store = store().await;
        store.upsert(&powermail()).await.expect("seed");

        let key = ExtensionKey::normalize("powermail").expect("key");
        let outcome = store.lookup(&key).await.expect("lookup");

        assert_eq!(outcome, LookupOutcome::Found(powermail()));
        store.pool().close().await;
    }

    #[tokio::test]
    async fn lookup_distinguishes_missing_keys() {
        let store = store().await;

        let key = ExtensionKey::normalize("doesnotexist123").expect("key");
        assert_eq!(store.lookup(&key).await.expect("lookup"), LookupOutcome::NotFound);
        store.pool().close().await;
    }

    #[tokio::test]
    async fn upsert_replaces_existing_rows() {
        let store = store().await;
        store.upsert(&powermail()).await.expect("seed");

        let mut updated = powermail();
        updated.version = "11.0.0".to_owned();
        updated.author = None;
        updated.last_updated = None;
        store.upsert(&updated).await.expect("update");

        let found = store.find("powermail").await.expect("find").expect("present");
        assert_eq!(found, updated);
        store.pool().close().await;
    }

    #[tokio::test]
    async fn non_numeric_timestamps_decode_as_unknown() {
        let store = store().await;
        sqlx::query(
            "INSERT INTO extension (extension_key, title, version, last_updated)
             VALUES ('news', 'News', '12.0.0', 'yesterday')",
        )
        .execute(store.pool())
        .await
        .expect("insert");

        let found = store.find("news").await.expect("find").expect("present");
        assert_eq!(found.last_updated, None);
        assert_eq!(found.author, None);
        store.pool().close().await;
    }

    #[tokio::test]
    async fn transport_failures_surface_as_source_errors() {
        let store = store().await;
        store.pool().close().await;

        let key = ExtensionKey::normalize("powermail").expect("key");
        assert!(matches!(store.lookup(&key).await, Err(SourceError::Unavailable(_))));
        assert!(store.ready().await.is_err());
    }
}
