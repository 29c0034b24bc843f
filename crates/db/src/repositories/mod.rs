use thiserror::Error;

use t3ext_core::source::SourceError;

pub mod extension;
pub mod memory;

pub use extension::SqlExtensionStore;
pub use memory::InMemoryExtensionSource;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for SourceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(source) => Self::Unavailable(source.to_string()),
            RepositoryError::Decode(message) => Self::Decode(message),
        }
    }
}
