//! Shared Module
//!
//! Types shared between the dashboard engine and the progress server: the
//! problem catalog, the wire format of batch updates, error types and the
//! sync configuration. Everything here is plain data and does no I/O.

/// Problem catalog and status values
pub mod catalog;

/// Wire format of the progress API
pub mod update;

/// Shared error types
pub mod error;

/// Sync configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use catalog::{Catalog, Difficulty, Item, ItemId, ProblemStatus};
pub use update::{BatchAck, BatchRequest, ConfirmedStatus, StatusUpdate};
pub use error::{EngineError, ProviderError, SyncError, SyncErrorKind};
pub use config::{ConfigError, SyncConfig, SyncConfigBuilder};
