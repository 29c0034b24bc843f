//! Slash-command verification token checks.

use secrecy::{ExposeSecret, SecretString};

/// Tokens accepted from Slack, parsed from a comma-separated configuration value.
///
/// A single configured value is simply a list of one, so exact-match deployments
/// and multi-workspace deployments share the same check.
#[derive(Clone, Debug, Default)]
pub struct TokenAllowList {
    tokens: Vec<SecretString>,
}

impl TokenAllowList {
    pub fn parse(raw: &str) -> Self {
        let tokens = raw
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| SecretString::from(token.to_owned()))
            .collect();
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Exact, case-sensitive comparison. An empty candidate never matches.
    pub fn matches(&self, candidate: &str) -> bool {
        !candidate.is_empty() && self.tokens.iter().any(|token| token.expose_secret() == candidate)
    }
}
