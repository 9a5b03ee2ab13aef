use crate::shared::config::{ConfigError, SyncConfig, SyncConfigBuilder};
use std::time::Duration;

/// Dashboard configuration: sync tuning plus server credentials
#[derive(Debug, Clone, Default)]
pub struct Config {
    sync: SyncConfig,
    token: Option<String>,
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: SyncConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self {
            sync: builder.build()?,
            token: None,
        })
    }

    /// Defaults overridden by `TRACKER_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = SyncConfig::builder();

        if let Ok(url) = std::env::var("TRACKER_API_URL") {
            builder = builder.server_url(url);
        }
        if let Ok(value) = std::env::var("TRACKER_MAX_BATCH") {
            let size = value
                .parse::<usize>()
                .map_err(|e| ConfigError::invalid("TRACKER_MAX_BATCH", e.to_string()))?;
            builder = builder.max_batch_size(size);
        }
        if let Ok(value) = std::env::var("TRACKER_DEBOUNCE_MS") {
            let millis = value
                .parse::<u64>()
                .map_err(|e| ConfigError::invalid("TRACKER_DEBOUNCE_MS", e.to_string()))?;
            builder = builder.debounce(Duration::from_millis(millis));
        }

        let mut config = Self::with_builder(builder)?;
        config.token = std::env::var("TRACKER_API_TOKEN")
            .ok()
            .filter(|token| !token.is_empty());

        tracing::debug!(
            "[CONFIG] server={} batch={} debounce={:?} token={}",
            config.server_url(),
            config.sync.max_batch_size,
            config.sync.debounce,
            config.token.is_some()
        );
        Ok(config)
    }

    /// Set the bearer token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn get_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url(), path)
    }

    pub fn server_url(&self) -> &str {
        self.sync.server_url.trim_end_matches('/')
    }

    pub fn sync(&self) -> &SyncConfig {
        &self.sync
    }
}
