//! Shared Error Types
//!
//! Error types for the progress sync engine and its collaborators.
//!
//! # Error Categories
//!
//! - `SyncError` - a batch push failed (transport, timeout, rejection)
//! - `ProviderError` - loading the catalog or confirmed statuses failed
//! - `EngineError` - errors returned to the presentation layer
//!
//! # Usage
//!
//! ```rust
//! use dsatrack::shared::error::{SyncError, SyncErrorKind};
//!
//! let error = SyncError::rejected(403, "forbidden");
//! assert_eq!(error.kind(), SyncErrorKind::Rejection);
//! ```
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync` and can be safely shared across thread boundaries.
use crate::shared::config::ConfigError;
use thiserror::Error;

/// Failure of a single batch push
///
/// The engine treats every variant the same way (rollback of the whole
/// batch); `kind()` exists for the presentation layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Connection failure, DNS failure, reset, ...
    #[error("Network error: {message}")]
    Transport {
        /// Human-readable error message
        message: String,
    },

    /// The request did not complete within the configured timeout
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout that elapsed
        timeout_ms: u64,
    },

    /// The server answered but refused the batch
    #[error("Server rejected batch ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Message from the response body
        message: String,
    },

    /// The server answered with a body we could not understand
    #[error("Malformed response: {message}")]
    MalformedResponse {
        /// Human-readable error message
        message: String,
    },
}

/// Coarse error taxonomy for the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// Timeout or connectivity loss
    Transient,
    /// Validation or authorization failure
    Rejection,
}

impl SyncError {
    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new rejection error
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Create a new malformed-response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn timeout(timeout: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::Transport { .. } | SyncError::Timeout { .. } => SyncErrorKind::Transient,
            SyncError::Rejected { .. } | SyncError::MalformedResponse { .. } => {
                SyncErrorKind::Rejection
            }
        }
    }

    /// Whether the failure is likely to go away on its own
    pub fn is_transient(&self) -> bool {
        self.kind() == SyncErrorKind::Transient
    }
}

/// Failure while loading session data from a collaborator
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Request failed or returned a non-success status
    #[error("Provider request failed: {message}")]
    Http {
        /// Human-readable error message
        message: String,
    },

    /// Response body could not be decoded
    #[error("Provider returned invalid data: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the engine to its callers
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// `set_status` was called for an id that is not in the catalog
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// The engine has been shut down
    #[error("Sync engine is shut down")]
    Closed,
}
