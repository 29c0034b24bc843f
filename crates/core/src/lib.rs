//! Domain core for the `/extension` slash command: configuration, key and
//! token validation, the data-source contract, and the audit trail.

pub mod audit;
pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod source;

pub use audit::{AuditEntry, AuditLogger, BlobError, BlobStore, FsBlobStore, InMemoryBlobStore};
pub use auth::TokenAllowList;
pub use domain::extension::{Author, DownloadLinks, ExtensionKey, ExtensionRecord};
pub use errors::{ApplicationError, DomainError};
pub use source::{ExtensionSource, LookupOutcome, SourceError};
