use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{error, info, warn};

use t3ext_core::audit::{AuditEntry, AuditLogger};
use t3ext_core::auth::TokenAllowList;
use t3ext_core::domain::extension::{ExtensionKey, ExtensionRecord};
use t3ext_core::errors::ApplicationError;
use t3ext_core::source::ExtensionSource;

use crate::attachments::SlackMessage;
use crate::messages;

/// Form fields Slack posts for a slash command. Missing fields are empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SlashCommandPayload {
    pub user_name: String,
    pub command: String,
    pub channel_name: String,
    pub text: String,
    pub token: String,
}

pub struct ExtensionCommandHandler {
    source: Arc<dyn ExtensionSource>,
    tokens: TokenAllowList,
    details_base_url: String,
    audit: Option<AuditLogger>,
}

impl ExtensionCommandHandler {
    pub fn new(
        source: Arc<dyn ExtensionSource>,
        tokens: TokenAllowList,
        details_base_url: impl Into<String>,
    ) -> Self {
        Self { source, tokens, details_base_url: details_base_url.into(), audit: None }
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn source(&self) -> &Arc<dyn ExtensionSource> {
        &self.source
    }

    pub async fn handle(&self, payload: &SlashCommandPayload, request_id: &str) -> SlackMessage {
        self.handle_at(payload, request_id, Utc::now()).await
    }

    /// Resolves one invocation into a response body. Never fails: every error
    /// becomes an ephemeral message.
    pub async fn handle_at(
        &self,
        payload: &SlashCommandPayload,
        request_id: &str,
        now: DateTime<Utc>,
    ) -> SlackMessage {
        info!(
            event_name = "slack.command.received",
            correlation_id = %request_id,
            command = %payload.command,
            slack_user = %payload.user_name,
            slack_channel = %payload.channel_name,
            source = self.source.name(),
            "slash command received"
        );

        let token_matched = self.tokens.matches(&payload.token);
        let (message, failure) = match self.resolve(payload, token_matched).await {
            Ok((key, record)) => {
                info!(
                    event_name = "slack.command.completed",
                    correlation_id = %request_id,
                    extension_key = %key,
                    "extension details sent"
                );
                (messages::extension_details(&record, &key, &self.details_base_url, now), None)
            }
            Err(failure) => {
                log_failure(&failure, request_id);
                (messages::error_message(&failure.user_message()), Some(failure))
            }
        };

        if let Some(audit) = &self.audit {
            let entry = AuditEntry {
                request_id: request_id.to_owned(),
                user: payload.user_name.clone(),
                command: payload.command.clone(),
                channel: payload.channel_name.clone(),
                text: payload.text.clone(),
                token_matched,
                error: failure.map(|failure| format!("{}: {failure}", failure.kind())),
            };
            audit.record(&entry, now).await;
        }

        message
    }

    async fn resolve(
        &self,
        payload: &SlashCommandPayload,
        token_matched: bool,
    ) -> Result<(ExtensionKey, ExtensionRecord), ApplicationError> {
        if !token_matched {
            return Err(ApplicationError::TokenMismatch);
        }
        let key = ExtensionKey::normalize(&payload.text)?;
        let record = self.source.lookup(&key).await?.into_record(&key)?;
        Ok((key, record))
    }
}

fn log_failure(failure: &ApplicationError, request_id: &str) {
    match failure {
        ApplicationError::TokenMismatch | ApplicationError::Domain(_) => warn!(
            event_name = "slack.command.rejected",
            correlation_id = %request_id,
            reason = failure.kind(),
            "slash command rejected"
        ),
        ApplicationError::NotFound { key } => info!(
            event_name = "slack.command.not_found",
            correlation_id = %request_id,
            extension_key = %key,
            "extension not found"
        ),
        ApplicationError::Upstream { .. } | ApplicationError::Source(_) => error!(
            event_name = "slack.command.lookup_failed",
            correlation_id = %request_id,
            reason = failure.kind(),
            error = %failure,
            "extension lookup failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use t3ext_core::audit::{AuditLogger, InMemoryBlobStore};
    use t3ext_core::auth::TokenAllowList;
    use t3ext_core::domain::extension::{Author, ExtensionKey, ExtensionRecord};
    use t3ext_core::source::{ExtensionSource, LookupOutcome, SourceError};
    use t3ext_db::InMemoryExtensionSource;

    use super::{ExtensionCommandHandler, SlashCommandPayload};

    const BASE: &str = "https://extensions.typo3.org/extension/";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).single().expect("valid instant")
    }

    fn powermail() -> ExtensionRecord {
        ExtensionRecord {
            key: "powermail".to_owned(),
            title: "Powermail".to_owned(),
            version: "10.9.1".to_owned(),
            author: Some(Author { name: "in2code".to_owned(), email: None }),
            last_updated: Some(now().timestamp() - 400 * 86_400),
            description: "Powerful and easy mailform extension".to_owned(),
            compatibility: vec!["10".to_owned(), "11".to_owned()],
            repository_url: Some("https://github.com/in2code-de/powermail".to_owned()),
            ..ExtensionRecord::default()
        }
    }

    fn handler(source: Arc<dyn ExtensionSource>) -> ExtensionCommandHandler {
        ExtensionCommandHandler::new(source, TokenAllowList::parse("token-a, token-b"), BASE)
    }

    fn store_handler() -> ExtensionCommandHandler {
        handler(Arc::new(InMemoryExtensionSource::with_records([powermail()])))
    }

    fn payload(text: &str, token: &str) -> SlashCommandPayload {
        SlashCommandPayload {
            user_name: "jane".to_owned(),
            command: "/extension".to_owned(),
            channel_name: "general".to_owned(),
            text: text.to_owned(),
            token: token.to_owned(),
        }
    }

    fn error_text(message: &crate::SlackMessage) -> String {
        message.attachments[0].fields[0].value.clone()
    }

    struct FixedSource(Result<LookupOutcome, &'static str>);

    #[async_trait]
    impl ExtensionSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn lookup(&self, _key: &ExtensionKey) -> Result<LookupOutcome, SourceError> {
            self.0.clone().map_err(|detail| SourceError::Unavailable(detail.to_owned()))
        }
    }

    #[tokio::test]
    async fn known_key_renders_channel_wide_details() {
        let message = store_handler().handle_at(&payload("powermail", "token-b"), "req-1", now()).await;

        assert!(!message.is_ephemeral());
        assert!(message.field("Latest version").is_some_and(|field| field.value == "10.9.1"));
        assert!(message
            .field("Last update")
            .is_some_and(|field| field.value.ends_with("(more than a year ago)")));
        assert!(message.field("Compatibility").is_some_and(|field| field.value == "TYPO3 v10 and v11"));
        assert!(message.field("Code Insight").is_some_and(|field| field.value.contains("|GitHub>")));
    }

    #[tokio::test]
    async fn key_is_lowercased_before_lookup() {
        let message = store_handler().handle_at(&payload("PowerMail", "token-a"), "req-2", now()).await;
        assert!(!message.is_ephemeral());
    }

    #[tokio::test]
    async fn unknown_key_is_reported_privately() {
        let message =
            store_handler().handle_at(&payload("doesnotexist123", "token-a"), "req-3", now()).await;

        assert!(message.is_ephemeral());
        assert_eq!(
            error_text(&message),
            "Could not find any extension with the extension key \"doesnotexist123\"."
        );
    }

    #[tokio::test]
    async fn malformed_keys_are_rejected() {
        let handler = store_handler();
        for text in ["", "ab", "power mail", "news-system", "ext!", "powermail "] {
            let message = handler.handle_at(&payload(text, "token-a"), "req-4", now()).await;
            assert!(message.is_ephemeral(), "{text:?} should be rejected");
            assert_eq!(error_text(&message), "Invalid extension key.", "{text:?}");
        }
    }

    #[tokio::test]
    async fn token_mismatch_wins_regardless_of_key() {
        let handler = store_handler();
        for (text, token) in [("powermail", "wrong"), ("ab", "wrong"), ("powermail", "")] {
            let message = handler.handle_at(&payload(text, token), "req-5", now()).await;
            assert!(message.is_ephemeral());
            assert_eq!(error_text(&message), "Configuration error (security token mismatch).");
        }
    }

    #[tokio::test]
    async fn upstream_descriptions_reach_the_caller() {
        let handler = handler(Arc::new(FixedSource(Ok(LookupOutcome::Failed {
            description: Some("Access token expired.".to_owned()),
        }))));
        let message = handler.handle_at(&payload("news", "token-a"), "req-6", now()).await;
        assert!(message.is_ephemeral());
        assert_eq!(error_text(&message), "Access token expired.");
    }

    #[tokio::test]
    async fn source_failures_fall_back_to_generic_message() {
        let handler = handler(Arc::new(FixedSource(Err("connection refused"))));
        let message = handler.handle_at(&payload("news", "token-a"), "req-7", now()).await;
        assert!(message.is_ephemeral());
        assert_eq!(error_text(&message), "Something went wrong.");
    }

    #[tokio::test]
    async fn audit_records_each_invocation_without_the_token() {
        let blobs = InMemoryBlobStore::default();
        let audit =
            AuditLogger::new(Arc::new(blobs.clone()), "audit-bucket", None, "extension", "extension-details");
        let handler = store_handler().with_audit(audit);

        handler.handle_at(&payload("powermail", "token-a"), "req-8", now()).await;
        handler.handle_at(&payload("powermail", "token-secret-x"), "req-9", now()).await;

        let objects = blobs.objects();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].0, "2024/03-Mar/20240315-120000.extension-details.log");
        assert!(objects[0].1.contains("token_matched"));
        assert!(!objects[0].1.contains("\nerror"));
        assert!(objects[1].1.contains("token_mismatch"));
        assert!(!objects[1].1.contains("token-secret-x"));
    }
}
