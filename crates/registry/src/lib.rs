//! Client for the TYPO3 Extension Repository (TER) REST API.
//!
//! One GET per lookup, no retries. The API answers a known key with a JSON
//! array whose first element describes the extension, and an unknown key (or
//! a rejected credential) with an object carrying `error_description`. Any
//! other answer, including transport errors, becomes a generic failure.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use t3ext_core::config::RemoteConfig;
use t3ext_core::domain::extension::{Author, DownloadLinks, ExtensionKey, ExtensionRecord};
use t3ext_core::source::{ExtensionSource, LookupOutcome, SourceError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("remote.access_token is not configured")]
    MissingAccessToken,
    #[error("http client could not be built: {0}")]
    Client(#[from] reqwest::Error),
}

pub struct RegistryClient {
    client: Client,
    config: RemoteConfig,
    access_token: SecretString,
}

impl RegistryClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, RegistryError> {
        let access_token = config.access_token.clone().ok_or(RegistryError::MissingAccessToken)?;
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;
        Ok(Self { client, config: config.clone(), access_token })
    }

    async fn fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .bearer_auth(self.access_token.expose_secret())
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .text()
            .await
    }
}

#[async_trait::async_trait]
impl ExtensionSource for RegistryClient {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn lookup(&self, key: &ExtensionKey) -> Result<LookupOutcome, SourceError> {
        let url = self.config.endpoint(key.as_str());
        let body = match self.fetch(&url).await {
            Ok(body) => body,
            Err(error) => {
                warn!(
                    event_name = "source.lookup.transport_failed",
                    extension_key = %key,
                    error = %error,
                    "registry request failed"
                );
                return Ok(LookupOutcome::Failed { description: None });
            }
        };

        let outcome = interpret_response(&body);
        debug!(
            event_name = "source.lookup.remote",
            extension_key = %key,
            found = matches!(outcome, LookupOutcome::Found(_)),
            "registry lookup completed"
        );
        Ok(outcome)
    }
}

/// Maps a raw API body onto a lookup outcome.
pub fn interpret_response(body: &str) -> LookupOutcome {
    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(error) => {
            warn!(event_name = "source.lookup.decode_failed", error = %error, "registry body is not JSON");
            return LookupOutcome::Failed { description: None };
        }
    };

    match value {
        Value::Array(items) => match items.first() {
            Some(Value::Object(details)) => LookupOutcome::Found(decode_extension(details)),
            _ => LookupOutcome::Failed { description: None },
        },
        Value::Object(map) => LookupOutcome::Failed {
            description: map.get("error_description").and_then(Value::as_str).map(str::to_owned),
        },
        _ => LookupOutcome::Failed { description: None },
    }
}

fn decode_extension(details: &Map<String, Value>) -> ExtensionRecord {
    let empty = Map::new();
    let current = object(details.get("current_version")).unwrap_or(&empty);
    let meta = object(details.get("meta")).unwrap_or(&empty);
    let download = object(current.get("download")).unwrap_or(&empty);

    ExtensionRecord {
        key: text(details.get("key")).unwrap_or_default(),
        title: text(current.get("title")).unwrap_or_default(),
        version: text(current.get("number")).unwrap_or_default(),
        author: decode_author(current.get("author")),
        last_updated: current.get("upload_date").and_then(Value::as_i64),
        description: text(current.get("description")).unwrap_or_default(),
        compatibility: current
            .get("typo3_versions")
            .and_then(Value::as_array)
            .map(|versions| versions.iter().filter_map(|version| text(Some(version))).collect())
            .unwrap_or_default(),
        downloads: DownloadLinks {
            zip: text(download.get("zip")),
            t3x: text(download.get("t3x")),
            packagist: text(meta.get("packagist")),
        },
        repository_url: text(meta.get("repository_url")),
    }
}

/// `author` is either a plain name or an object with `name` and `email`.
fn decode_author(value: Option<&Value>) -> Option<Author> {
    match value? {
        Value::String(name) if !name.is_empty() => Some(Author { name: name.clone(), email: None }),
        Value::Object(author) => {
            let name = text(author.get("name"))?;
            Some(Author { name, email: text(author.get("email")) })
        }
        _ => None,
    }
}

fn object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value.and_then(Value::as_object)
}

/// Non-empty string content; numbers are rendered so `typo3_versions: [10, 11]` works too.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
