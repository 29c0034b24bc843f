use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::TokenAllowList;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub remote: RemoteConfig,
    pub audit: AuditConfig,
    pub links: LinksConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    /// Comma-separated list of accepted slash-command verification tokens.
    pub tokens: SecretString,
}

#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub kind: SourceKind,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub url: String,
    pub table: String,
    pub region: Option<String>,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub host: String,
    pub path: String,
    pub access_token: Option<SecretString>,
    /// Request timeout. Unset keeps the HTTP client's own default.
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct AuditConfig {
    /// Directory acting as the blob-store bucket. Audit logging is off when unset.
    pub bucket: Option<String>,
    pub function_name: String,
}

#[derive(Clone, Debug)]
pub struct LinksConfig {
    pub details_base_url: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Store,
    Remote,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub slack_tokens: Option<String>,
    pub source_kind: Option<SourceKind>,
    pub store_url: Option<String>,
    pub store_table: Option<String>,
    pub remote_host: Option<String>,
    pub remote_path: Option<String>,
    pub remote_access_token: Option<String>,
    pub audit_bucket: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig { tokens: String::new().into() },
            source: SourceConfig { kind: SourceKind::Remote },
            store: StoreConfig {
                url: "sqlite://t3ext.db?mode=rwc".to_string(),
                table: "extension".to_string(),
                region: None,
                max_connections: 5,
                timeout_secs: 30,
            },
            remote: RemoteConfig {
                host: "extensions.typo3.org".to_string(),
                path: "/api/v1/extension/".to_string(),
                access_token: None,
                timeout_secs: None,
            },
            audit: AuditConfig { bucket: None, function_name: "extension-details".to_string() },
            links: LinksConfig {
                details_base_url: "https://extensions.typo3.org/extension/".to_string(),
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "store" => Ok(Self::Store),
            "remote" => Ok(Self::Remote),
            other => Err(ConfigError::Validation(format!(
                "unsupported source kind `{other}` (expected store|remote)"
            ))),
        }
    }
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Remote => "remote",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl SlackConfig {
    pub fn allow_list(&self) -> TokenAllowList {
        TokenAllowList::parse(self.tokens.expose_secret())
    }
}

impl RemoteConfig {
    /// Full lookup URL for `key`. A bare host name is reached over https.
    pub fn endpoint(&self, key: &str) -> String {
        let host = self.host.trim().trim_end_matches('/');
        let base = if host.contains("://") { host.to_string() } else { format!("https://{host}") };
        format!("{base}{}{key}", self.path)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("t3ext.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(slack) = patch.slack {
            if let Some(tokens) = slack.tokens {
                self.slack.tokens = secret_value(tokens);
            }
        }

        if let Some(source) = patch.source {
            if let Some(kind) = source.kind {
                self.source.kind = kind;
            }
        }

        if let Some(store) = patch.store {
            if let Some(url) = store.url {
                self.store.url = url;
            }
            if let Some(table) = store.table {
                self.store.table = table;
            }
            if let Some(region) = store.region {
                self.store.region = Some(region);
            }
            if let Some(max_connections) = store.max_connections {
                self.store.max_connections = max_connections;
            }
            if let Some(timeout_secs) = store.timeout_secs {
                self.store.timeout_secs = timeout_secs;
            }
        }

        if let Some(remote) = patch.remote {
            if let Some(host) = remote.host {
                self.remote.host = host;
            }
            if let Some(path) = remote.path {
                self.remote.path = path;
            }
            if let Some(access_token) = remote.access_token {
                self.remote.access_token = Some(secret_value(access_token));
            }
            if let Some(timeout_secs) = remote.timeout_secs {
                self.remote.timeout_secs = Some(timeout_secs);
            }
        }

        if let Some(audit) = patch.audit {
            if let Some(bucket) = audit.bucket {
                self.audit.bucket = Some(bucket);
            }
            if let Some(function_name) = audit.function_name {
                self.audit.function_name = function_name;
            }
        }

        if let Some(links) = patch.links {
            if let Some(details_base_url) = links.details_base_url {
                self.links.details_base_url = details_base_url;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // SLACK_TOKEN, TER_* and AWS_* are the names used by existing Lambda deployments.
        if let Some(value) = read_env("T3EXT_SLACK_TOKENS").or_else(|| read_env("SLACK_TOKEN")) {
            self.slack.tokens = secret_value(value);
        }

        if let Some(value) = read_env("T3EXT_SOURCE_KIND") {
            self.source.kind = value.parse()?;
        }

        if let Some(value) = read_env("T3EXT_STORE_URL") {
            self.store.url = value;
        }
        if let Some(value) = read_env("T3EXT_STORE_TABLE") {
            self.store.table = value;
        }
        if let Some(value) = read_env("T3EXT_STORE_REGION").or_else(|| read_env("AWS_REGION")) {
            self.store.region = Some(value);
        }
        if let Some(value) = read_env("T3EXT_STORE_MAX_CONNECTIONS") {
            self.store.max_connections = parse_u32("T3EXT_STORE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("T3EXT_STORE_TIMEOUT_SECS") {
            self.store.timeout_secs = parse_u64("T3EXT_STORE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("T3EXT_REMOTE_HOST").or_else(|| read_env("TER_HOSTNAME")) {
            self.remote.host = value;
        }
        if let Some(value) = read_env("T3EXT_REMOTE_PATH").or_else(|| read_env("TER_PATH")) {
            self.remote.path = value;
        }
        let access_token =
            read_env("T3EXT_REMOTE_ACCESS_TOKEN").or_else(|| read_env("TER_ACCESS_TOKEN"));
        if let Some(value) = access_token {
            self.remote.access_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("T3EXT_REMOTE_TIMEOUT_SECS") {
            self.remote.timeout_secs = Some(parse_u64("T3EXT_REMOTE_TIMEOUT_SECS", &value)?);
        }

        if let Some(value) = read_env("T3EXT_AUDIT_BUCKET") {
            self.audit.bucket = Some(value);
        }
        let function_name =
            read_env("T3EXT_AUDIT_FUNCTION_NAME").or_else(|| read_env("AWS_LAMBDA_FUNCTION_NAME"));
        if let Some(value) = function_name {
            self.audit.function_name = value;
        }

        if let Some(value) = read_env("T3EXT_LINKS_DETAILS_BASE_URL") {
            self.links.details_base_url = value;
        }

        if let Some(value) = read_env("T3EXT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("T3EXT_SERVER_PORT") {
            self.server.port = parse_u16("T3EXT_SERVER_PORT", &value)?;
        }

        let log_level = read_env("T3EXT_LOGGING_LEVEL").or_else(|| read_env("T3EXT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("T3EXT_LOGGING_FORMAT").or_else(|| read_env("T3EXT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(tokens) = overrides.slack_tokens {
            self.slack.tokens = secret_value(tokens);
        }
        if let Some(kind) = overrides.source_kind {
            self.source.kind = kind;
        }
        if let Some(url) = overrides.store_url {
            self.store.url = url;
        }
        if let Some(table) = overrides.store_table {
            self.store.table = table;
        }
        if let Some(host) = overrides.remote_host {
            self.remote.host = host;
        }
        if let Some(path) = overrides.remote_path {
            self.remote.path = path;
        }
        if let Some(access_token) = overrides.remote_access_token {
            self.remote.access_token = Some(secret_value(access_token));
        }
        if let Some(bucket) = overrides.audit_bucket {
            self.audit.bucket = Some(bucket);
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_slack(&self.slack)?;
        match self.source.kind {
            SourceKind::Store => validate_store(&self.store)?,
            SourceKind::Remote => validate_remote(&self.remote)?,
        }
        validate_audit(&self.audit)?;
        validate_links(&self.links)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("t3ext.toml"), PathBuf::from("config/t3ext.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    if slack.allow_list().is_empty() {
        return Err(ConfigError::Validation(
            "slack.tokens is required. Copy the verification token from https://api.slack.com/apps > Your App > Basic Information".to_string(),
        ));
    }
    Ok(())
}

fn validate_store(store: &StoreConfig) -> Result<(), ConfigError> {
    let url = store.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "store.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if !is_sql_identifier(&store.table) {
        return Err(ConfigError::Validation(format!(
            "store.table `{}` must be a plain identifier ([A-Za-z_][A-Za-z0-9_]*)",
            store.table
        )));
    }

    if store.max_connections == 0 {
        return Err(ConfigError::Validation(
            "store.max_connections must be greater than zero".to_string(),
        ));
    }

    if store.timeout_secs == 0 || store.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "store.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_remote(remote: &RemoteConfig) -> Result<(), ConfigError> {
    if remote.host.trim().is_empty() {
        return Err(ConfigError::Validation("remote.host is required".to_string()));
    }

    if !remote.path.starts_with('/') {
        return Err(ConfigError::Validation("remote.path must start with `/`".to_string()));
    }

    let missing_token = remote
        .access_token
        .as_ref()
        .map(|value| value.expose_secret().trim().is_empty())
        .unwrap_or(true);
    if missing_token {
        return Err(ConfigError::Validation(
            "remote.access_token is required when source.kind is `remote`".to_string(),
        ));
    }

    if remote.timeout_secs.is_some_and(|secs| secs == 0 || secs > 300) {
        return Err(ConfigError::Validation(
            "remote.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_audit(audit: &AuditConfig) -> Result<(), ConfigError> {
    if audit.bucket.as_deref().is_some_and(|bucket| bucket.trim().is_empty()) {
        return Err(ConfigError::Validation("audit.bucket must not be blank".to_string()));
    }

    let name = audit.function_name.trim();
    if name.is_empty() || name.contains('/') {
        return Err(ConfigError::Validation(
            "audit.function_name must be non-empty and must not contain `/`".to_string(),
        ));
    }

    Ok(())
}

fn validate_links(links: &LinksConfig) -> Result<(), ConfigError> {
    let url = &links.details_base_url;
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "links.details_base_url must start with http:// or https://".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn is_sql_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    slack: Option<SlackPatch>,
    source: Option<SourcePatch>,
    store: Option<StorePatch>,
    remote: Option<RemotePatch>,
    audit: Option<AuditPatch>,
    links: Option<LinksPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    tokens: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SourcePatch {
    kind: Option<SourceKind>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    url: Option<String>,
    table: Option<String>,
    region: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RemotePatch {
    host: Option<String>,
    path: Option<String>,
    access_token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AuditPatch {
    bucket: Option<String>,
    function_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LinksPatch {
    details_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
