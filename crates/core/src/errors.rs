use thiserror::Error;

pub const INVALID_KEY_MESSAGE: &str = "Invalid extension key.";
pub const TOKEN_MISMATCH_MESSAGE: &str = "Configuration error (security token mismatch).";
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid extension key `{0}`")]
    InvalidExtensionKey(String),
}

/// Every way a slash-command invocation can fail. Each variant resolves to a
/// caller-visible message; none of them reaches Slack as an HTTP error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("slash-command token is not in the configured allow-list")]
    TokenMismatch,
    #[error("extension `{key}` was not found")]
    NotFound { key: String },
    #[error("upstream lookup failed: {}", .description.as_deref().unwrap_or("no description"))]
    Upstream { description: Option<String> },
    #[error("data source failure: {0}")]
    Source(String),
}

impl ApplicationError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Domain(DomainError::InvalidExtensionKey(_)) => INVALID_KEY_MESSAGE.to_owned(),
            Self::TokenMismatch => TOKEN_MISMATCH_MESSAGE.to_owned(),
            Self::NotFound { key } => {
                format!("Could not find any extension with the extension key \"{key}\".")
            }
            Self::Upstream { description: Some(description) }
                if !description.trim().is_empty() =>
            {
                description.clone()
            }
            Self::Upstream { .. } | Self::Source(_) => GENERIC_FAILURE_MESSAGE.to_owned(),
        }
    }

    /// Short classification used in logs and audit records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Domain(_) => "invalid_key",
            Self::TokenMismatch => "token_mismatch",
            Self::NotFound { .. } => "not_found",
            Self::Upstream { .. } => "upstream_failure",
            Self::Source(_) => "source_failure",
        }
    }
}
