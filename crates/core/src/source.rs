//! The lookup contract shared by the key-value store and the remote registry.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::extension::{ExtensionKey, ExtensionRecord};
use crate::errors::ApplicationError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(ExtensionRecord),
    NotFound,
    /// The source answered, but not with a record. `description` is the
    /// upstream explanation, when it supplied one.
    Failed { description: Option<String> },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("data source unavailable: {0}")]
    Unavailable(String),
    #[error("record could not be decoded: {0}")]
    Decode(String),
}

impl From<SourceError> for ApplicationError {
    fn from(error: SourceError) -> Self {
        Self::Source(error.to_string())
    }
}

impl LookupOutcome {
    pub fn into_record(self, key: &ExtensionKey) -> Result<ExtensionRecord, ApplicationError> {
        match self {
            Self::Found(record) => Ok(record),
            Self::NotFound => Err(ApplicationError::NotFound { key: key.to_string() }),
            Self::Failed { description } => Err(ApplicationError::Upstream { description }),
        }
    }
}

#[async_trait]
pub trait ExtensionSource: Send + Sync {
    /// Short name for logs and health output.
    fn name(&self) -> &'static str;

    async fn lookup(&self, key: &ExtensionKey) -> Result<LookupOutcome, SourceError>;

    /// Cheap readiness probe for the health endpoint. Sources without a local
    /// dependency to probe report ready.
    async fn ready(&self) -> Result<(), SourceError> {
        Ok(())
    }
}
