//! Progress API Client
//!
//! HTTP implementation of the remote progress endpoint and of both startup
//! providers, talking JSON to the progress server.
//!
//! | Call | Route |
//! |------|-------|
//! | `push_updates` | `POST /api/progress/batch` |
//! | `fetch_catalog` | `GET /api/problems` |
//! | `fetch_confirmed` | `GET /api/progress` |

use crate::dashboard::config::Config;
use crate::dashboard::providers::{CatalogProvider, StatusProvider};
use crate::dashboard::sync::ProgressEndpoint;
use crate::shared::catalog::Item;
use crate::shared::config::ConfigError;
use crate::shared::error::{ProviderError, SyncError};
use crate::shared::update::{BatchAck, BatchRequest, ConfirmedStatus};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

const BATCH_PATH: &str = "/api/progress/batch";
const PROBLEMS_PATH: &str = "/api/problems";
const PROGRESS_PATH: &str = "/api/progress";

/// Progress API client
#[derive(Debug, Clone)]
pub struct HttpProgressClient {
    config: Config,
    client: Client,
    timeout: Duration,
}

impl HttpProgressClient {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let timeout = config.sync().request_timeout;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::invalid("http_client", e.to_string()))?;

        Ok(Self {
            config: config.clone(),
            client,
            timeout,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.get_token() {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    fn map_send_error(&self, error: reqwest::Error) -> SyncError {
        if error.is_timeout() {
            SyncError::timeout(self.timeout)
        } else {
            tracing::error!("[HTTP] Batch request failed: {}", error);
            SyncError::transport(error.to_string())
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let url = self.config.api_url(path);
        tracing::debug!("[HTTP] GET {}", url);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| ProviderError::http(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            return Err(ProviderError::http(format!(
                "GET {} failed: {} - {}",
                path, status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::http(format!("Failed to read body: {}", e)))?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ProgressEndpoint for HttpProgressClient {
    async fn push_updates(&self, request: &BatchRequest) -> Result<BatchAck, SyncError> {
        let url = self.config.api_url(BATCH_PATH);
        tracing::debug!("[HTTP] POST {} ({} update(s))", url, request.updates.len());

        let response = self
            .authorize(self.client.post(&url))
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            let message = if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            };
            tracing::warn!("[HTTP] Batch rejected with {}: {}", status, message);
            return Err(SyncError::rejected(status.as_u16(), message));
        }

        if body.trim().is_empty() {
            return Ok(BatchAck::default());
        }
        serde_json::from_str(&body).map_err(|e| SyncError::malformed(e.to_string()))
    }
}

#[async_trait]
impl CatalogProvider for HttpProgressClient {
    async fn fetch_catalog(&self) -> Result<Vec<Item>, ProviderError> {
        let items: Vec<Item> = self.get_json(PROBLEMS_PATH).await?;
        tracing::info!("[HTTP] Loaded {} catalog item(s)", items.len());
        Ok(items)
    }
}

#[async_trait]
impl StatusProvider for HttpProgressClient {
    async fn fetch_confirmed(&self) -> Result<Vec<ConfirmedStatus>, ProviderError> {
        let rows: Vec<ConfirmedStatus> = self.get_json(PROGRESS_PATH).await?;
        tracing::info!("[HTTP] Loaded {} confirmed status row(s)", rows.len());
        Ok(rows)
    }
}
