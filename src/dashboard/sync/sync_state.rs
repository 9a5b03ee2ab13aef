//! # Sync State
//!
//! Snapshot behind the "N pending sync" indicator.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncState {
    /// A batch request is in flight
    pub is_syncing: bool,
    /// Mutations waiting in the queue
    pub queued: usize,
    /// Mutations in the batch being sent
    pub in_flight: usize,
    /// Last successful flush
    pub last_sync: Option<DateTime<Utc>>,
    /// Message of the last failed flush, cleared by a success
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

impl SyncState {
    /// Edits not yet confirmed by the server
    pub fn pending(&self) -> usize {
        self.queued + self.in_flight
    }

    /// Whether the indicator should show "still syncing"
    pub fn has_unsynced_changes(&self) -> bool {
        self.pending() > 0
    }
}
