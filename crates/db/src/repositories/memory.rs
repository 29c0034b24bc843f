use std::collections::HashMap;

use t3ext_core::domain::extension::{ExtensionKey, ExtensionRecord};
use t3ext_core::source::{ExtensionSource, LookupOutcome, SourceError};

/// Map-backed source for tests and local demos.
#[derive(Default)]
pub struct InMemoryExtensionSource {
    records: HashMap<String, ExtensionRecord>,
}

impl InMemoryExtensionSource {
    pub fn with_records(records: impl IntoIterator<Item = ExtensionRecord>) -> Self {
        let records = records.into_iter().map(|record| (record.key.clone(), record)).collect();
        Self { records }
    }
}

#[async_trait::async_trait]
impl ExtensionSource for InMemoryExtensionSource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn lookup(&self, key: &ExtensionKey) -> Result<LookupOutcome, SourceError> {
        Ok(self.records.get(key.as_str()).cloned().map_or(LookupOutcome::NotFound, LookupOutcome::Found))
    }
}
