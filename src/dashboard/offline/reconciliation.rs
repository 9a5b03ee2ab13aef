//! # Reconciliation
//!
//! Applies the outcome of a batch push to the status store.
//!
//! Every mutation in the batch is checked against the live state before
//! anything is changed. A mutation is **superseded** when the user edited the
//! same item again after the batch was captured: either the item is back in
//! the pending queue, or the shown status no longer equals the batch target.
//! Superseded mutations never touch the shown status.
//!
//! | outcome | still current | superseded |
//! |---------|---------------|------------|
//! | success | confirmed     | confirmation discarded (baseline updated) |
//! | failure | rolled back to last confirmed status | left alone |
//!
//! Items missing from the catalog are logged and skipped without aborting
//! the rest of the batch.

use crate::dashboard::offline::optimistic::StatusStore;
use crate::dashboard::offline::queue::{BatchSnapshot, MutationState, PendingQueue};
use crate::shared::catalog::{Catalog, ItemId, ProblemStatus};
use crate::shared::error::SyncError;
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

/// Items the server acknowledged for one batch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfirmedSet {
    items: HashSet<ItemId>,
}

impl ConfirmedSet {
    /// Every item of the batch is confirmed (the endpoint succeeds as a unit)
    pub fn for_batch(batch: &BatchSnapshot) -> Self {
        Self {
            items: batch.item_ids().map(str::to_string).collect(),
        }
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.items.contains(item_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// What reconciliation did with one mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "resolution")]
pub enum Resolution {
    /// Server holds the value the user still sees
    Confirmed,
    /// A newer local edit exists; this result was not applied to the view
    Superseded,
    /// Push failed; the shown value went back to `restored`
    RolledBack { restored: ProblemStatus },
    /// Item is not in the catalog
    Ignored,
}

impl Resolution {
    /// Terminal lifecycle state reached by the mutation, if it reached one
    pub fn terminal_state(&self) -> Option<MutationState> {
        match self {
            Resolution::Confirmed => Some(MutationState::Confirmed),
            Resolution::RolledBack { .. } => Some(MutationState::RolledBack),
            Resolution::Superseded | Resolution::Ignored => None,
        }
    }
}

/// Per-item result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResolution {
    pub item_id: ItemId,
    /// Status the batch tried to write
    pub target: ProblemStatus,
    #[serde(flatten)]
    pub resolution: Resolution,
}

/// Summary of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub batch_id: Uuid,
    /// Error of the push, `None` on success
    pub error: Option<SyncError>,
    pub items: Vec<ItemResolution>,
}

impl ReconciliationReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    fn ids_with(&self, pred: impl Fn(&Resolution) -> bool) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| pred(&item.resolution))
            .map(|item| item.item_id.clone())
            .collect()
    }

    pub fn confirmed(&self) -> Vec<ItemId> {
        self.ids_with(|r| matches!(r, Resolution::Confirmed))
    }

    pub fn superseded(&self) -> Vec<ItemId> {
        self.ids_with(|r| matches!(r, Resolution::Superseded))
    }

    pub fn rolled_back(&self) -> Vec<ItemId> {
        self.ids_with(|r| matches!(r, Resolution::RolledBack { .. }))
    }

    pub fn ignored(&self) -> Vec<ItemId> {
        self.ids_with(|r| matches!(r, Resolution::Ignored))
    }
}

/// Apply a batch outcome to the store
///
/// `queue` is the live pending queue (edits made after the batch was
/// captured); it is only read.
pub fn reconcile(
    store: &mut StatusStore,
    queue: &PendingQueue,
    catalog: &Catalog,
    batch: &BatchSnapshot,
    result: &Result<ConfirmedSet, SyncError>,
) -> ReconciliationReport {
    let mut items = Vec::with_capacity(batch.len());
    let mut unacknowledged = 0;

    for mutation in batch.mutations() {
        let item_id = mutation.item_id.as_str();

        if !catalog.contains(item_id) {
            tracing::warn!(
                "[RECONCILE] Batch {} references unknown item {}, skipping",
                batch.id(),
                item_id
            );
            items.push(ItemResolution {
                item_id: mutation.item_id.clone(),
                target: mutation.target,
                resolution: Resolution::Ignored,
            });
            continue;
        }

        let superseded = queue.contains(item_id) || store.get(item_id) != mutation.target;

        let resolution = match result {
            Ok(confirmed) if confirmed.contains(item_id) => {
                // The server holds this value now, whatever the user did since
                store.confirm(item_id, mutation.target);
                if superseded {
                    tracing::debug!(
                        "[RECONCILE] {} confirmed as {} but superseded locally",
                        item_id,
                        mutation.target
                    );
                    Resolution::Superseded
                } else {
                    Resolution::Confirmed
                }
            }
            Ok(_) => {
                unacknowledged += 1;
                tracing::warn!(
                    "[RECONCILE] Server did not acknowledge {} in batch {}",
                    item_id,
                    batch.id()
                );
                rollback_unless_superseded(store, item_id, superseded)
            }
            Err(_) => rollback_unless_superseded(store, item_id, superseded),
        };

        items.push(ItemResolution {
            item_id: mutation.item_id.clone(),
            target: mutation.target,
            resolution,
        });
    }

    let report = ReconciliationReport {
        batch_id: batch.id(),
        error: match result {
            Err(error) => Some(error.clone()),
            Ok(_) if unacknowledged > 0 => Some(SyncError::malformed(format!(
                "server did not acknowledge {} of {} update(s)",
                unacknowledged,
                batch.len()
            ))),
            Ok(_) => None,
        },
        items,
    };

    match &report.error {
        None => tracing::info!(
            "[RECONCILE] Batch {} confirmed: {} confirmed, {} superseded, {} ignored",
            report.batch_id,
            report.confirmed().len(),
            report.superseded().len(),
            report.ignored().len()
        ),
        Some(error) => tracing::warn!(
            "[RECONCILE] Batch {} failed ({}): {} rolled back, {} superseded",
            report.batch_id,
            error,
            report.rolled_back().len(),
            report.superseded().len()
        ),
    }

    report
}

fn rollback_unless_superseded(
    store: &mut StatusStore,
    item_id: &str,
    superseded: bool,
) -> Resolution {
    if superseded {
        tracing::debug!("[RECONCILE] {} failed but a newer edit is pending, keeping it", item_id);
        Resolution::Superseded
    } else {
        let restored = store.rollback(item_id);
        Resolution::RolledBack { restored }
    }
}
