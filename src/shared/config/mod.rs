//! Sync configuration module
//!
//! Tuning knobs of the progress sync engine: batch size threshold, debounce
//! delay, request timeout and failure backoff. Values come from the builder,
//! a TOML file, or both.
//!
//! ```toml
//! server_url = "https://tracker.example.edu"
//! max_batch_size = 10
//! debounce_ms = 2000
//! request_timeout_ms = 10000
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default progress server
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";
/// Queue size that triggers an immediate flush
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;
/// Quiet period before a debounced flush
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(2);
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(60);
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Sync engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Base URL of the progress server
    pub server_url: String,
    /// Flush immediately once this many mutations are queued
    pub max_batch_size: usize,
    /// Flush after this long without a new edit
    pub debounce: Duration,
    /// Upper bound for one batch request
    pub request_timeout: Duration,
    /// First backoff step after a failed flush
    pub backoff_base: Duration,
    /// Backoff ceiling
    pub backoff_max: Duration,
    /// Buffer size of the event channel
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            debounce: DEFAULT_DEBOUNCE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SyncConfig {
    /// Create a new SyncConfigBuilder
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.server_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.server_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                self.server_url
            )));
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::invalid("max_batch_size", "must be at least 1"));
        }
        if self.debounce.is_zero() {
            return Err(ConfigError::invalid("debounce", "must be greater than zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid("request_timeout", "must be greater than zero"));
        }
        if self.backoff_base > self.backoff_max {
            return Err(ConfigError::invalid(
                "backoff_base",
                "must not exceed backoff_max",
            ));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::invalid("event_capacity", "must be at least 1"));
        }
        Ok(())
    }

    /// Parse and validate a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: SyncConfigFile = toml::from_str(source)?;
        file.into_builder(Self::builder()).build()
    }

    /// Read a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

/// Builder for SyncConfig
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    server_url: Option<String>,
    max_batch_size: Option<usize>,
    debounce: Option<Duration>,
    request_timeout: Option<Duration>,
    backoff_base: Option<Duration>,
    backoff_max: Option<Duration>,
    event_capacity: Option<usize>,
}

impl SyncConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = Some(size);
        self
    }

    pub fn debounce(mut self, delay: Duration) -> Self {
        self.debounce = Some(delay);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = Some(base);
        self.backoff_max = Some(max);
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let defaults = SyncConfig::default();
        let config = SyncConfig {
            server_url: self.server_url.unwrap_or(defaults.server_url),
            max_batch_size: self.max_batch_size.unwrap_or(defaults.max_batch_size),
            debounce: self.debounce.unwrap_or(defaults.debounce),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            backoff_base: self.backoff_base.unwrap_or(defaults.backoff_base),
            backoff_max: self.backoff_max.unwrap_or(defaults.backoff_max),
            event_capacity: self.event_capacity.unwrap_or(defaults.event_capacity),
        };
        config.validate()?;
        Ok(config)
    }
}

/// On-disk representation; durations are milliseconds
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SyncConfigFile {
    server_url: Option<String>,
    max_batch_size: Option<usize>,
    debounce_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    backoff_base_ms: Option<u64>,
    backoff_max_ms: Option<u64>,
    event_capacity: Option<usize>,
}

impl SyncConfigFile {
    fn into_builder(self, mut builder: SyncConfigBuilder) -> SyncConfigBuilder {
        builder.server_url = self.server_url.or(builder.server_url);
        builder.max_batch_size = self.max_batch_size.or(builder.max_batch_size);
        builder.debounce = self.debounce_ms.map(Duration::from_millis).or(builder.debounce);
        builder.request_timeout = self
            .request_timeout_ms
            .map(Duration::from_millis)
            .or(builder.request_timeout);
        builder.backoff_base = self
            .backoff_base_ms
            .map(Duration::from_millis)
            .or(builder.backoff_base);
        builder.backoff_max = self
            .backoff_max_ms
            .map(Duration::from_millis)
            .or(builder.backoff_max);
        builder.event_capacity = self.event_capacity.or(builder.event_capacity);
        builder
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }
}
