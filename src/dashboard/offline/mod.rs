//! # Offline Mutation Handling
//!
//! Local bookkeeping for status edits that the server has not confirmed yet.
//! Nothing in this module does I/O or can fail.
//!
//! ## Key Components
//!
//! - `optimistic.rs`: status store with optimistic and confirmed layers
//! - `queue.rs`: deduplicating pending mutation queue and batch snapshots
//! - `reconciliation.rs`: applies batch outcomes, including rollback
//! - `retry.rs`: failure backoff and the manual retry ledger

pub mod optimistic;
pub mod queue;
pub mod reconciliation;
pub mod retry;

// Re-export main types
pub use optimistic::StatusStore;
pub use queue::{BatchSnapshot, MutationState, PendingQueue, QueuedMutation};
pub use reconciliation::{
    reconcile, ConfirmedSet, ItemResolution, ReconciliationReport, Resolution,
};
pub use retry::{Backoff, FailedMutation, RetryLedger};
