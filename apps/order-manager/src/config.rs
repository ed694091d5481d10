//! Configuration management for the order manager.
//!
//! Configuration is layered:
//! 1. Built-in defaults
//! 2. `config.toml` in the directory named by `APP_CONFIG_DIR` (default `.`),
//!    if the file exists
//! 3. Environment variables with the `APP_` prefix (`APP_HTTP_PORT`, ...)
//!
//! The sidecar endpoint and token also honour the variables the Dapr runtime
//! injects (`DAPR_HTTP_ENDPOINT`, `DAPR_API_TOKEN`) when no `APP_` override
//! is set.
//!
//! ```toml
//! [http]
//! port = 8080
//!
//! [log]
//! level = "info"
//!
//! [pubsub]
//! name = "pubsub"
//! topic = "orders"
//!
//! [statestore]
//! name = "kvstore"
//!
//! [dapr]
//! port = 50001
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the configuration directory.
pub const CONFIG_DIR_ENV: &str = "APP_CONFIG_DIR";

/// Configuration file looked up in the configuration directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file exists but could not be read
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File path
        path: PathBuf,
        /// I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema
    #[error("failed to parse {origin}: {reason}")]
    Parse {
        /// Where the document came from
        origin: String,
        /// Parser message
        reason: String,
    },

    /// An environment override could not be parsed
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidEnv {
        /// Variable name
        var: String,
        /// Raw value
        value: String,
        /// Parser message
        reason: String,
    },

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Public API listener
    pub http: HttpConfig,
    /// Logging
    pub log: LogConfig,
    /// Pub/sub component used for order events
    pub pubsub: PubSubConfig,
    /// State store component holding orders
    pub statestore: StateStoreConfig,
    /// Sidecar connection and callback listener
    pub dapr: DaprConfig,
}

/// Public API listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Port to bind to
    pub port: u16,
    /// Grace period for in-flight requests on shutdown
    pub shutdown_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            shutdown_timeout_secs: 3,
        }
    }
}

impl HttpConfig {
    /// Grace period as a `Duration`.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Pub/sub configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PubSubConfig {
    /// Pub/sub component name
    pub name: String,
    /// Topic order events are published to
    pub topic: String,
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            name: "pubsub".to_string(),
            topic: "orders".to_string(),
        }
    }
}

/// State store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StateStoreConfig {
    /// State store component name
    pub name: String,
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        Self {
            name: "kvstore".to_string(),
        }
    }
}

/// Sidecar configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaprConfig {
    /// Port of the app callback listener the sidecar calls into
    pub port: u16,
    /// Sidecar HTTP endpoint
    pub http_endpoint: String,
    /// Token sent as `dapr-api-token`
    pub api_token: Option<String>,
    /// Per-request timeout for sidecar calls
    pub timeout_secs: u64,
}

impl Default for DaprConfig {
    fn default() -> Self {
        Self {
            port: 50001,
            http_endpoint: "http://localhost:3500".to_string(),
            api_token: None,
            timeout_secs: 5,
        }
    }
}

impl DaprConfig {
    /// Sidecar request timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Keeps the token out of logs.
impl fmt::Debug for DaprConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaprConfig")
            .field("port", &self.port)
            .field("http_endpoint", &self.http_endpoint)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load configuration from `$APP_CONFIG_DIR/config.toml` and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but is unreadable or
    /// malformed, an override does not parse, or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let dir = std::env::var(CONFIG_DIR_ENV).unwrap_or_else(|_| ".".to_string());
        Self::load_from(Path::new(&dir), |var| std::env::var(var).ok())
    }

    /// Load configuration from `dir` with environment lookups served by `env`.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from<F>(dir: &Path, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = dir.join(CONFIG_FILE_NAME);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(text) => {
                tracing::debug!(path = %path.display(), "Reading configuration file");
                Self::from_toml_str(&text, &path.display().to_string())?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML, unknown keys, or
    /// values of the wrong type.
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            origin: origin.to_string(),
            reason: e.to_string(),
        })
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |var: &str| env(var).filter(|value| !value.is_empty());

        if let Some(port) = parse_env(&lookup, "APP_HTTP_PORT")? {
            self.http.port = port;
        }
        if let Some(secs) = parse_env(&lookup, "APP_HTTP_SHUTDOWN_TIMEOUT_SECS")? {
            self.http.shutdown_timeout_secs = secs;
        }
        if let Some(level) = lookup("APP_LOG_LEVEL") {
            self.log.level = level;
        }
        if let Some(name) = lookup("APP_PUBSUB_NAME") {
            self.pubsub.name = name;
        }
        if let Some(topic) = lookup("APP_PUBSUB_TOPIC") {
            self.pubsub.topic = topic;
        }
        if let Some(name) = lookup("APP_STATESTORE_NAME") {
            self.statestore.name = name;
        }
        if let Some(port) = parse_env(&lookup, "APP_DAPR_PORT")? {
            self.dapr.port = port;
        }
        if let Some(endpoint) =
            lookup("APP_DAPR_HTTP_ENDPOINT").or_else(|| lookup("DAPR_HTTP_ENDPOINT"))
        {
            self.dapr.http_endpoint = endpoint;
        }
        if let Some(token) = lookup("APP_DAPR_API_TOKEN").or_else(|| lookup("DAPR_API_TOKEN")) {
            self.dapr.api_token = Some(token);
        }
        if let Some(secs) = parse_env(&lookup, "APP_DAPR_TIMEOUT_SECS")? {
            self.dapr.timeout_secs = secs;
        }
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::Validation("http.port must be non-zero".to_string()));
        }
        if self.http.shutdown_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "http.shutdown_timeout_secs must be > 0".to_string(),
            ));
        }
        if !LOG_LEVELS
            .iter()
            .any(|level| level.eq_ignore_ascii_case(&self.log.level))
        {
            return Err(ConfigError::Validation(format!(
                "log.level must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                self.log.level
            )));
        }
        if self.pubsub.name.trim().is_empty() {
            return Err(ConfigError::Validation("pubsub.name cannot be empty".to_string()));
        }
        if self.pubsub.topic.trim().is_empty() {
            return Err(ConfigError::Validation("pubsub.topic cannot be empty".to_string()));
        }
        if self.statestore.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "statestore.name cannot be empty".to_string(),
            ));
        }
        if self.dapr.port == 0 {
            return Err(ConfigError::Validation("dapr.port must be non-zero".to_string()));
        }
        if self.dapr.port == self.http.port {
            return Err(ConfigError::Validation(format!(
                "dapr.port and http.port must differ (both {})",
                self.http.port
            )));
        }
        if !(self.dapr.http_endpoint.starts_with("http://")
            || self.dapr.http_endpoint.starts_with("https://"))
        {
            return Err(ConfigError::Validation(format!(
                "dapr.http_endpoint must start with http:// or https://, got {:?}",
                self.dapr.http_endpoint
            )));
        }
        if self.dapr.timeout_secs == 0 {
            return Err(ConfigError::Validation("dapr.timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

fn parse_env<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
                var: var.to_string(),
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}
