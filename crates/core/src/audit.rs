//! Best-effort audit trail: one plain-text object per invocation.

use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

const LABEL_WIDTH: usize = 21;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("object key `{0}` is not a relative path")]
    InvalidKey(String),
    #[error("could not write object `{key}`: {source}")]
    Io { key: String, source: std::io::Error },
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, body: String) -> Result<(), BlobError>;
}

/// Directory-backed bucket; object keys become relative file paths.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(key);
        let plain = relative.components().all(|component| matches!(component, Component::Normal(_)));
        if key.is_empty() || !plain {
            return Err(BlobError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, body: String) -> Result<(), BlobError> {
        let path = self.object_path(key)?;
        let io_error = |source| BlobError::Io { key: key.to_owned(), source };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(&path, body).await.map_err(io_error)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    objects: Arc<Mutex<Vec<(String, String)>>>,
}

impl InMemoryBlobStore {
    pub fn objects(&self) -> Vec<(String, String)> {
        match self.objects.lock() {
            Ok(objects) => objects.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, body: String) -> Result<(), BlobError> {
        match self.objects.lock() {
            Ok(mut objects) => objects.push((key.to_owned(), body)),
            Err(poisoned) => poisoned.into_inner().push((key.to_owned(), body)),
        }
        Ok(())
    }
}

/// Facts captured about one invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuditEntry {
    pub request_id: String,
    pub user: String,
    pub command: String,
    pub channel: String,
    pub text: String,
    pub token_matched: bool,
    /// Failure classification and detail, absent for successful lookups.
    pub error: Option<String>,
}

pub struct AuditLogger {
    store: Arc<dyn BlobStore>,
    bucket: String,
    region: Option<String>,
    table: String,
    function_name: String,
}

impl AuditLogger {
    pub fn new(
        store: Arc<dyn BlobStore>,
        bucket: impl Into<String>,
        region: Option<String>,
        table: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            region,
            table: table.into(),
            function_name: function_name.into(),
        }
    }

    /// Time-partitioned object key, e.g. `2021/03-Mar/20210323-101500.fn.log`.
    pub fn object_key(&self, at: DateTime<Utc>) -> String {
        format!("{}.{}.log", at.format("%Y/%m-%b/%Y%m%d-%H%M%S"), self.function_name)
    }

    pub fn render(&self, entry: &AuditEntry, key: &str, at: DateTime<Utc>) -> String {
        let mut lines = vec![
            line("timestamp", &at.format("%d/%b/%Y %H:%M:%S").to_string()),
            line("region", self.region.as_deref().unwrap_or("")),
            line("table", &self.table),
            line("bucket", &self.bucket),
            line("object_key", key),
            line("token_matched", if entry.token_matched { "yes" } else { "no" }),
            line("slack_user", &entry.user),
            line("slack_command", &entry.command),
            line("slack_channel", &entry.channel),
            line("slack_command_text", &entry.text),
            line("request_id", &entry.request_id),
        ];
        if let Some(error) = &entry.error {
            lines.push(line("error", error));
        }
        let mut body = lines.join("\n");
        body.push('\n');
        body
    }

    /// Writes the entry and swallows any failure. The slash-command response
    /// never depends on the audit trail.
    pub async fn record(&self, entry: &AuditEntry, at: DateTime<Utc>) {
        let key = self.object_key(at);
        let body = self.render(entry, &key, at);
        match self.store.put(&key, body).await {
            Ok(()) => debug!(
                event_name = "audit.write.stored",
                correlation_id = %entry.request_id,
                object_key = %key,
                "audit record stored"
            ),
            Err(error) => warn!(
                event_name = "audit.write.failed",
                correlation_id = %entry.request_id,
                object_key = %key,
                error = %error,
                "audit record write failed"
            ),
        }
    }
}

fn line(label: &str, value: &str) -> String {
    format!("{label:.<width$}: {value}", width = LABEL_WIDTH)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use super::{AuditEntry, AuditLogger, BlobError, BlobStore, FsBlobStore, InMemoryBlobStore};

    struct FailingStore;

    #[async_trait]
    impl BlobStore for FailingStore {
        async fn put(&self, key: &str, _body: String) -> Result<(), BlobError> {
            Err(BlobError::InvalidKey(key.to_owned()))
        }
    }

    fn entry() -> AuditEntry {
        AuditEntry {
            request_id: "req-1".to_owned(),
            user: "jane".to_owned(),
            command: "/extension".to_owned(),
            channel: "general".to_owned(),
            text: "news".to_owned(),
            token_matched: true,
            error: None,
        }
    }

    fn logger(store: Arc<dyn BlobStore>) -> AuditLogger {
        AuditLogger::new(store, "audit-bucket", Some("eu-central-1".to_owned()), "extension", "details")
    }

    #[test]
    fn object_key_is_time_partitioned() {
        let at = Utc.with_ymd_and_hms(2021, 3, 7, 9, 5, 2).single().expect("timestamp");
        let key = logger(Arc::new(InMemoryBlobStore::default())).object_key(at);
        assert_eq!(key, "2021/03-Mar/20210307-090502.details.log");
    }

    #[test]
    fn render_lists_every_fact_with_aligned_labels() {
        let at = Utc.with_ymd_and_hms(2021, 3, 7, 9, 5, 2).single().expect("timestamp");
        let audit = logger(Arc::new(InMemoryBlobStore::default()));
        let mut failed = entry();
        failed.error = Some("not_found".to_owned());

        let body = audit.render(&failed, "k.log", at);
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines[0], "timestamp............: 07/Mar/2021 09:05:02");
        assert!(lines.contains(&"region...............: eu-central-1"));
        assert!(lines.contains(&"slack_command_text...: news"));
        assert!(lines.contains(&"request_id...........: req-1"));
        assert_eq!(lines.last().copied(), Some("error................: not_found"));
        assert!(body.ends_with('\n'));
    }

    #[tokio::test]
    async fn record_writes_one_object() {
        let store = InMemoryBlobStore::default();
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).single().expect("timestamp");

        logger(Arc::new(store.clone())).record(&entry(), at).await;

        let objects = store.objects();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].0, "2024/12-Dec/20241231-235959.details.log");
        assert!(objects[0].1.contains("slack_user...........: jane"));
    }

    #[tokio::test]
    async fn record_swallows_store_failures() {
        let at = Utc::now();
        logger(Arc::new(FailingStore)).record(&entry(), at).await;
    }

    #[tokio::test]
    async fn fs_store_creates_partition_directories() {
        let dir = TempDir::new().expect("tempdir");
        let store = FsBlobStore::new(dir.path());

        store.put("2021/03-Mar/a.log", "body\n".to_owned()).await.expect("put");

        let written =
            std::fs::read_to_string(dir.path().join("2021/03-Mar/a.log")).expect("read back");
        assert_eq!(written, "body\n");
    }

    #[tokio::test]
    async fn fs_store_rejects_escaping_keys() {
        let dir = TempDir::new().expect("tempdir");
        let store = FsBlobStore::new(dir.path());

        for key in ["", "../outside.log", "/etc/passwd", "a/../../b.log"] {
            assert!(
                matches!(store.put(key, String::new()).await, Err(BlobError::InvalidKey(_))),
                "{key:?} should be rejected"
            );
        }
    }
}
