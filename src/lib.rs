//! DSATrack - Progress Sync Library
//!
//! DSATrack is the client-side engine behind a student dashboard that tracks
//! completion of a curated list of programming problems. Status edits are
//! applied to the local view instantly, coalesced into batches, pushed to the
//! progress server and reconciled (or rolled back) when the server answers.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared with the server
//!   - Catalog items, problem statuses, wire format of batch updates
//!   - Error types
//!   - Sync configuration
//!
//! - **`dashboard`** - The client engine
//!   - Status store, pending mutation queue, reconciliation
//!   - Batch scheduler and sync client
//!   - Aggregate statistics for charts
//!   - HTTP client for the progress API
//!
//! # Usage
//!
//! ```rust,no_run
//! use dsatrack::dashboard::{Config, HttpProgressClient, SyncEngine};
//! use dsatrack::shared::ProblemStatus;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let client = Arc::new(HttpProgressClient::new(&config)?);
//! let engine = SyncEngine::load(
//!     &*client,
//!     &*client,
//!     client.clone(),
//!     config.sync().clone(),
//! )
//! .await?;
//!
//! engine.set_status("two-sum", ProblemStatus::Completed).await?;
//! println!("{:?}", engine.aggregate_stats().await);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! All mutable engine state lives behind one `tokio::sync::Mutex` that is
//! never held across the network call, so queue, store and scheduler updates
//! are atomic with respect to each other.

/// Shared types and data structures
pub mod shared;

/// Progress sync engine used by the dashboard
pub mod dashboard;
