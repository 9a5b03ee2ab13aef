//! # Pending Mutation Queue
//!
//! Holds local status edits the server has not confirmed yet.
//!
//! ## Features
//!
//! - **Coalescing**: at most one entry per item; a new edit replaces the old
//!   one (last write wins) and moves to the back of the queue
//! - **Snapshots**: `drain_snapshot` detaches everything queued into an
//!   immutable `BatchSnapshot`, leaving a fresh queue for edits made while
//!   the batch is in flight
//!
//! ## Usage
//!
//! ```rust
//! use dsatrack::dashboard::offline::PendingQueue;
//! use dsatrack::shared::ProblemStatus;
//!
//! let mut queue = PendingQueue::new();
//! queue.enqueue("two-sum", ProblemStatus::InProgress);
//! queue.enqueue("two-sum", ProblemStatus::Completed);
//! assert_eq!(queue.len(), 1);
//!
//! let batch = queue.drain_snapshot();
//! assert!(queue.is_empty());
//! assert_eq!(batch.len(), 1);
//! ```

use crate::shared::catalog::{ItemId, ProblemStatus};
use crate::shared::update::{BatchRequest, StatusUpdate};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use uuid::Uuid;

/// A local edit waiting to be sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedMutation {
    /// Item being edited
    pub item_id: ItemId,
    /// Status the user picked
    pub target: ProblemStatus,
    /// When the (latest) edit was made
    pub enqueued_at: DateTime<Utc>,
}

/// Lifecycle of a queued mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// Applied locally, waiting in the queue
    Local,
    /// Captured in a batch that is being sent
    InFlight,
    /// Server acknowledged it
    Confirmed,
    /// Server call failed; the optimistic value was reverted
    RolledBack,
}

/// Deduplicating queue of pending mutations
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: VecDeque<QueuedMutation>,
}

impl PendingQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the mutation for an item
    ///
    /// Returns the mutation that was replaced, if any.
    pub fn enqueue(&mut self, item_id: &str, target: ProblemStatus) -> Option<QueuedMutation> {
        let replaced = self
            .entries
            .iter()
            .position(|entry| entry.item_id == item_id)
            .and_then(|pos| self.entries.remove(pos));

        let mutation = QueuedMutation {
            item_id: item_id.to_string(),
            target,
            enqueued_at: Utc::now(),
        };
        self.entries.push_back(mutation);

        if let Some(old) = &replaced {
            tracing::debug!(
                "[SYNC] Coalesced {}: {} replaced by {}",
                item_id,
                old.target,
                target
            );
        }
        replaced
    }

    /// Remove every entry and return them as an immutable batch
    pub fn drain_snapshot(&mut self) -> BatchSnapshot {
        let mutations: Vec<QueuedMutation> = self.entries.drain(..).collect();
        BatchSnapshot {
            id: Uuid::new_v4(),
            captured_at: Utc::now(),
            mutations,
        }
    }

    /// Pending mutation for an item
    pub fn get(&self, item_id: &str) -> Option<&QueuedMutation> {
        self.entries.iter().find(|entry| entry.item_id == item_id)
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.get(item_id).is_some()
    }

    /// Number of queued mutations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in the order the final values were set
    pub fn iter(&self) -> impl Iterator<Item = &QueuedMutation> {
        self.entries.iter()
    }
}

/// Immutable set of mutations captured at flush time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSnapshot {
    id: Uuid,
    captured_at: DateTime<Utc>,
    mutations: Vec<QueuedMutation>,
}

impl BatchSnapshot {
    /// Batch identifier, used in logs and events
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn mutations(&self) -> &[QueuedMutation] {
        &self.mutations
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Item ids in the batch
    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.mutations.iter().map(|m| m.item_id.as_str())
    }

    /// Request body carrying every `{itemId, status}` pair of the batch
    pub fn to_request(&self) -> BatchRequest {
        BatchRequest {
            updates: self
                .mutations
                .iter()
                .map(|m| StatusUpdate::new(m.item_id.clone(), m.target))
                .collect(),
        }
    }
}
