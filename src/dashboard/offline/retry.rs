//! # Backoff and Manual Retry
//!
//! Nothing here retries on its own. Failed mutations are remembered so the
//! user can retry them explicitly, and consecutive failed flushes stretch the
//! scheduler's debounce delay so a dead network is not hammered.
//!
//! ## Features
//!
//! - **Exponential Backoff**: `base * 2^(n-1)` capped at `max`
//! - **Retry Ledger**: failed mutations with attempt count and last error
//!
//! ## Usage
//!
//! ```rust
//! use dsatrack::dashboard::offline::retry::Backoff;
//! use std::time::Duration;
//!
//! let backoff = Backoff::new(Duration::from_secs(2), Duration::from_secs(60));
//! assert_eq!(backoff.delay_for(0), Duration::ZERO);
//! assert_eq!(backoff.delay_for(3), Duration::from_secs(8));
//! ```

use crate::shared::catalog::{ItemId, ProblemStatus};
use crate::shared::error::SyncError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

/// Doubling delay with a ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay to apply after `failures` consecutive failed flushes
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(failures.saturating_sub(1).min(16));
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// A mutation whose push failed and was rolled back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedMutation {
    pub item_id: ItemId,
    /// Status the user wanted
    pub target: ProblemStatus,
    /// Failed pushes so far
    pub attempts: u32,
    pub last_error: SyncError,
    pub failed_at: DateTime<Utc>,
}

/// Failed mutations available for manual retry
#[derive(Debug, Default)]
pub struct RetryLedger {
    failed: HashMap<ItemId, FailedMutation>,
}

impl RetryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a rolled-back mutation
    pub fn record_failure(&mut self, item_id: &str, target: ProblemStatus, error: &SyncError) {
        let now = Utc::now();
        self.failed
            .entry(item_id.to_string())
            .and_modify(|entry| {
                if entry.target != target {
                    entry.attempts = 0;
                }
                entry.target = target;
                entry.attempts += 1;
                entry.last_error = error.clone();
                entry.failed_at = now;
            })
            .or_insert_with(|| FailedMutation {
                item_id: item_id.to_string(),
                target,
                attempts: 1,
                last_error: error.clone(),
                failed_at: now,
            });
    }

    /// Forget an item (confirmed, or the user edited it again)
    pub fn forget(&mut self, item_id: &str) -> Option<FailedMutation> {
        self.failed.remove(item_id)
    }

    /// Every remembered mutation, oldest failure first
    pub fn oldest_first(&self) -> Vec<FailedMutation> {
        let mut failed: Vec<FailedMutation> = self.failed.values().cloned().collect();
        failed.sort_by(|a, b| {
            a.failed_at
                .cmp(&b.failed_at)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        failed
    }

    pub fn get(&self, item_id: &str) -> Option<&FailedMutation> {
        self.failed.get(item_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FailedMutation> {
        self.failed.values()
    }

    pub fn len(&self) -> usize {
        self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failed.is_empty()
    }
}
