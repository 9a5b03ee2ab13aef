//! # Status Store
//!
//! Owned key→status view rendered by the dashboard. Holds two layers:
//!
//! - **current**: what the UI shows, including optimistic edits not yet
//!   confirmed by the server
//! - **confirmed**: last status the server acknowledged per item, used as
//!   the rollback target
//!
//! Absent entries read as `NotStarted` in both layers.
//!
//! ## Usage
//!
//! ```rust
//! use dsatrack::dashboard::offline::StatusStore;
//! use dsatrack::shared::ProblemStatus;
//!
//! let mut store = StatusStore::new();
//! store.apply_optimistic("two-sum", ProblemStatus::Completed);
//! assert_eq!(store.get("two-sum"), ProblemStatus::Completed);
//!
//! store.rollback("two-sum");
//! assert_eq!(store.get("two-sum"), ProblemStatus::NotStarted);
//! ```

use crate::shared::catalog::{ItemId, ProblemStatus};
use crate::shared::update::ConfirmedStatus;
use std::collections::HashMap;

/// Optimistic status store
#[derive(Debug, Clone, Default)]
pub struct StatusStore {
    /// Statuses shown to the user
    current: HashMap<ItemId, ProblemStatus>,
    /// Statuses acknowledged by the server
    confirmed: HashMap<ItemId, ProblemStatus>,
}

impl StatusStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with server-confirmed statuses
    pub fn from_confirmed(rows: impl IntoIterator<Item = ConfirmedStatus>) -> Self {
        let confirmed: HashMap<ItemId, ProblemStatus> = rows
            .into_iter()
            .map(|row| (row.item_id, row.status))
            .collect();

        Self {
            current: confirmed.clone(),
            confirmed,
        }
    }

    /// Status currently shown for an item
    pub fn get(&self, item_id: &str) -> ProblemStatus {
        self.current.get(item_id).copied().unwrap_or_default()
    }

    /// Last server-confirmed status for an item
    pub fn confirmed(&self, item_id: &str) -> ProblemStatus {
        self.confirmed.get(item_id).copied().unwrap_or_default()
    }

    /// Apply a local edit before the server has seen it
    ///
    /// Returns the status that was shown before the edit.
    pub fn apply_optimistic(&mut self, item_id: &str, status: ProblemStatus) -> ProblemStatus {
        let previous = self
            .current
            .insert(item_id.to_string(), status)
            .unwrap_or_default();
        tracing::debug!("[STORE] {} {} -> {} (optimistic)", item_id, previous, status);
        previous
    }

    /// Record that the server now holds `status` for an item
    ///
    /// Only the rollback baseline moves; the shown value is left alone so a
    /// newer local edit stays visible.
    pub fn confirm(&mut self, item_id: &str, status: ProblemStatus) {
        self.confirmed.insert(item_id.to_string(), status);
    }

    /// Restore the shown value to the last confirmed status
    ///
    /// Returns the restored status.
    pub fn rollback(&mut self, item_id: &str) -> ProblemStatus {
        let restored = self.confirmed(item_id);
        if self.confirmed.contains_key(item_id) {
            self.current.insert(item_id.to_string(), restored);
        } else {
            self.current.remove(item_id);
        }
        tracing::debug!("[STORE] {} rolled back to {}", item_id, restored);
        restored
    }

    /// Whether the shown value differs from the server's
    pub fn is_dirty(&self, item_id: &str) -> bool {
        self.get(item_id) != self.confirmed(item_id)
    }

    /// Iterate explicitly recorded (shown) statuses
    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, ProblemStatus)> {
        self.current.iter().map(|(id, status)| (id, *status))
    }
}
