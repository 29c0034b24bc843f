use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use t3ext_core::config::AppConfig;
use toml::Value;

use super::{load_config, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    CommandResult::success("config", render(&config))
}

pub fn render(config: &AppConfig) -> String {
    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source_of = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let allow_list = config.slack.allow_list();
    let access_token = match &config.remote.access_token {
        Some(token) => redact_token(token.expose_secret()),
        None => "<unset>".to_string(),
    };

    let entries = vec![
        entry(
            "slack.tokens",
            format!("<{} redacted>", allow_list.len()),
            &["T3EXT_SLACK_TOKENS", "SLACK_TOKEN"],
        ),
        entry("source.kind", config.source.kind.as_str().to_string(), &["T3EXT_SOURCE_KIND"]),
        entry("store.url", config.store.url.clone(), &["T3EXT_STORE_URL"]),
        entry("store.table", config.store.table.clone(), &["T3EXT_STORE_TABLE"]),
        entry(
            "store.region",
            config.store.region.clone().unwrap_or_else(|| "<unset>".to_string()),
            &["T3EXT_STORE_REGION", "AWS_REGION"],
        ),
        entry(
            "store.max_connections",
            config.store.max_connections.to_string(),
            &["T3EXT_STORE_MAX_CONNECTIONS"],
        ),
        entry("store.timeout_secs", config.store.timeout_secs.to_string(), &["T3EXT_STORE_TIMEOUT_SECS"]),
        entry("remote.host", config.remote.host.clone(), &["T3EXT_REMOTE_HOST", "TER_HOSTNAME"]),
        entry("remote.path", config.remote.path.clone(), &["T3EXT_REMOTE_PATH", "TER_PATH"]),
        entry("remote.access_token", access_token, &["T3EXT_REMOTE_ACCESS_TOKEN", "TER_ACCESS_TOKEN"]),
        entry(
            "remote.timeout_secs",
            config.remote.timeout_secs.map_or_else(|| "<client default>".to_string(), |secs| secs.to_string()),
            &["T3EXT_REMOTE_TIMEOUT_SECS"],
        ),
        entry(
            "audit.bucket",
            config.audit.bucket.clone().unwrap_or_else(|| "<disabled>".to_string()),
            &["T3EXT_AUDIT_BUCKET"],
        ),
        entry(
            "audit.function_name",
            config.audit.function_name.clone(),
            &["T3EXT_AUDIT_FUNCTION_NAME", "AWS_LAMBDA_FUNCTION_NAME"],
        ),
        entry(
            "links.details_base_url",
            config.links.details_base_url.clone(),
            &["T3EXT_LINKS_DETAILS_BASE_URL"],
        ),
        entry("server.bind_address", config.server.bind_address.clone(), &["T3EXT_SERVER_BIND_ADDRESS"]),
        entry("server.port", config.server.port.to_string(), &["T3EXT_SERVER_PORT"]),
        entry("logging.level", config.logging.level.clone(), &["T3EXT_LOGGING_LEVEL", "T3EXT_LOG_LEVEL"]),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["T3EXT_LOGGING_FORMAT", "T3EXT_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        entries
            .into_iter()
            .map(|(key, value, env_keys)| render_line(key, &value, source_of(key, env_keys))),
    );
    lines.join("\n")
}

type Entry = (&'static str, String, &'static [&'static str]);

fn entry(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Entry {
    (key, value, env_keys)
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("t3ext.toml"), PathBuf::from("config/t3ext.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a short prefix so operators can tell tokens apart.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }
    "<redacted>".to_string()
}
