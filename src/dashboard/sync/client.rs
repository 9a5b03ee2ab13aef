//! # Sync Client
//!
//! Pushes one `BatchSnapshot` to the progress endpoint as a single request.
//! The whole batch succeeds or fails as a unit, and the client never retries.
//! The configured timeout is enforced here regardless of what the transport
//! does, so a hung endpoint surfaces as `SyncError::Timeout`.

use crate::dashboard::offline::{BatchSnapshot, ConfirmedSet};
use crate::shared::error::SyncError;
use crate::shared::update::{BatchAck, BatchRequest};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Remote endpoint accepting a batch of status updates
#[async_trait]
pub trait ProgressEndpoint: Send + Sync {
    async fn push_updates(&self, request: &BatchRequest) -> Result<BatchAck, SyncError>;
}

/// Batch sender with timeout
#[derive(Clone)]
pub struct SyncClient {
    endpoint: Arc<dyn ProgressEndpoint>,
    timeout: Duration,
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SyncClient {
    pub fn new(endpoint: Arc<dyn ProgressEndpoint>, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    /// Send a batch; returns the items the server confirmed
    pub async fn sync(&self, batch: &BatchSnapshot) -> Result<ConfirmedSet, SyncError> {
        let request = batch.to_request();
        tracing::info!(
            "[SYNC] Sending batch {} with {} update(s)",
            batch.id(),
            request.updates.len()
        );

        let ack = tokio::time::timeout(self.timeout, self.endpoint.push_updates(&request))
            .await
            .map_err(|_| SyncError::timeout(self.timeout))??;

        if !ack.success {
            return Err(SyncError::rejected(
                200,
                ack.message.unwrap_or_else(|| "batch not accepted".to_string()),
            ));
        }

        if let Some(updated) = ack.updated {
            if updated != request.updates.len() {
                tracing::debug!(
                    "[SYNC] Server reported {} row(s) written for {} update(s)",
                    updated,
                    request.updates.len()
                );
            }
        }

        Ok(ConfirmedSet::for_batch(batch))
    }
}
