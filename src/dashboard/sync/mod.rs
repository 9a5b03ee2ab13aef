//! # Progress Sync Engine
//!
//! Ties the offline bookkeeping to the network. A status edit flows through
//! the engine like this:
//!
//! 1. `set_status` applies the edit to the status store, queues it
//!    (replacing any older edit of the same item) and recomputes the stats
//! 2. the batch scheduler flushes immediately once the queue is full, or
//!    after the debounce delay
//! 3. the flush drains the queue into a `BatchSnapshot` and the sync client
//!    sends it as one request; new edits go to the fresh queue meanwhile
//! 4. reconciliation confirms or rolls back each mutation and the stats are
//!    recomputed again
//!
//! At most one flush is in flight. Every state change is broadcast as an
//! `EngineEvent` so the UI can re-render.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dsatrack::dashboard::sync::{next_event, EngineEvent, SyncEngine};
//! use dsatrack::shared::ProblemStatus;
//!
//! # async fn example(engine: SyncEngine) -> Result<(), dsatrack::shared::EngineError> {
//! let mut events = engine.subscribe();
//! engine.set_status("two-sum", ProblemStatus::Completed).await?;
//!
//! while let Some(event) = next_event(&mut events).await {
//!     if let EngineEvent::FlushFailed { error, .. } = event {
//!         println!("Could not save progress: {}", error);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod metrics;
pub mod scheduler;
pub mod sync_state;

pub use client::{ProgressEndpoint, SyncClient};
pub use metrics::SyncMetrics;
pub use scheduler::{BatchScheduler, FlushPermit, ScheduleDecision};
pub use sync_state::SyncState;

use crate::dashboard::offline::{
    reconcile, BatchSnapshot, FailedMutation, MutationState, PendingQueue, ReconciliationReport,
    Resolution, RetryLedger, StatusStore,
};
use crate::dashboard::providers::{CatalogProvider, StatusProvider};
use crate::dashboard::stats::{project, AggregateStats};
use crate::shared::catalog::{Catalog, ItemId, ProblemStatus};
use crate::shared::config::SyncConfig;
use crate::shared::error::{EngineError, SyncError};
use crate::shared::update::ConfirmedStatus;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

/// Notification for the presentation layer
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The shown status of an item changed (edit or rollback)
    StatusChanged {
        item_id: ItemId,
        status: ProblemStatus,
    },
    /// Aggregate stats were recomputed
    StatsChanged(AggregateStats),
    /// A batch request was sent
    FlushStarted { batch_id: Uuid, size: usize },
    /// A batch was accepted by the server
    FlushConfirmed(ReconciliationReport),
    /// A batch failed and its mutations were rolled back
    FlushFailed {
        error: SyncError,
        report: ReconciliationReport,
    },
}

/// Result of a flush attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// A batch was sent and reconciled
    Flushed(ReconciliationReport),
    /// Another flush is in flight; a follow-up runs when it completes
    Deferred,
    /// Nothing was queued
    Empty,
    /// The engine was shut down
    Closed,
}

/// Next event from a subscription, skipping over lag
///
/// A slow subscriber loses the oldest events but keeps receiving; `None`
/// once the engine is gone.
pub async fn next_event(events: &mut broadcast::Receiver<EngineEvent>) -> Option<EngineEvent> {
    loop {
        match events.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("[SYNC] Subscriber lagged, skipped {} event(s)", skipped);
                continue;
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

/// Mutable engine state, guarded by one mutex
#[derive(Debug)]
struct EngineState {
    store: StatusStore,
    queue: PendingQueue,
    scheduler: BatchScheduler,
    stats: AggregateStats,
    retry: RetryLedger,
    metrics: SyncMetrics,
    sync_state: SyncState,
    /// Batch currently being sent
    in_flight: Option<BatchSnapshot>,
    /// Terminal state of the last reconciled mutation per item
    outcomes: HashMap<ItemId, MutationState>,
    closed: bool,
}

impl EngineState {
    fn refresh_sync_state(&mut self) {
        self.sync_state.queued = self.queue.len();
        self.sync_state.in_flight = self.in_flight.as_ref().map_or(0, BatchSnapshot::len);
        self.sync_state.is_syncing = self.in_flight.is_some();
        self.sync_state.consecutive_failures = self.scheduler.consecutive_failures();
    }
}

#[derive(Debug)]
struct EngineInner {
    catalog: Catalog,
    client: SyncClient,
    events: broadcast::Sender<EngineEvent>,
    state: Mutex<EngineState>,
}

impl EngineInner {
    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Handle to the sync engine; cheap to clone
#[derive(Debug, Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    /// Create an engine from an already loaded catalog and confirmed statuses
    pub fn new(
        catalog: Catalog,
        confirmed: Vec<ConfirmedStatus>,
        endpoint: Arc<dyn ProgressEndpoint>,
        config: SyncConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let unknown = confirmed
            .iter()
            .filter(|row| !catalog.contains(&row.item_id))
            .count();
        if unknown > 0 {
            tracing::warn!(
                "[SYNC] {} confirmed status row(s) reference items outside the catalog",
                unknown
            );
        }

        let store = StatusStore::from_confirmed(confirmed);
        let stats = project(&store, &catalog);
        let (events, _) = broadcast::channel(config.event_capacity);

        tracing::info!(
            "[SYNC] Engine ready: {} item(s), batch size {}, debounce {:?}",
            catalog.len(),
            config.max_batch_size,
            config.debounce
        );

        let state = EngineState {
            store,
            queue: PendingQueue::new(),
            scheduler: BatchScheduler::new(&config),
            stats,
            retry: RetryLedger::new(),
            metrics: SyncMetrics::new(),
            sync_state: SyncState::default(),
            in_flight: None,
            outcomes: HashMap::new(),
            closed: false,
        };

        Ok(Self {
            inner: Arc::new(EngineInner {
                catalog,
                client: SyncClient::new(endpoint, config.request_timeout),
                events,
                state: Mutex::new(state),
            }),
        })
    }

    /// Load the catalog and confirmed statuses from their providers
    pub async fn load(
        catalog: &dyn CatalogProvider,
        statuses: &dyn StatusProvider,
        endpoint: Arc<dyn ProgressEndpoint>,
        config: SyncConfig,
    ) -> Result<Self, EngineError> {
        let items = catalog.fetch_catalog().await?;
        let confirmed = statuses.fetch_confirmed().await?;
        Self::new(Catalog::new(items), confirmed, endpoint, config)
    }

    /// Record a status edit; the only mutation entry point
    ///
    /// The new status is visible through `get_status` and `aggregate_stats`
    /// as soon as this returns.
    pub async fn set_status(&self, item_id: &str, status: ProblemStatus) -> Result<(), EngineError> {
        if !self.inner.catalog.contains(item_id) {
            tracing::warn!("[SYNC] Ignoring edit for unknown item {}", item_id);
            return Err(EngineError::UnknownItem(item_id.to_string()));
        }

        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        if state.closed {
            return Err(EngineError::Closed);
        }

        state.retry.forget(item_id);
        Self::enqueue_locked(&self.inner, state, item_id, status);
        Ok(())
    }

    /// Shown status of an item, including optimistic edits
    pub async fn get_status(&self, item_id: &str) -> ProblemStatus {
        self.inner.state.lock().await.store.get(item_id)
    }

    pub async fn aggregate_stats(&self) -> AggregateStats {
        self.inner.state.lock().await.stats.clone()
    }

    /// Edits not yet confirmed (queued plus in flight)
    pub async fn pending_count(&self) -> usize {
        self.inner.state.lock().await.sync_state.pending()
    }

    pub async fn sync_state(&self) -> SyncState {
        self.inner.state.lock().await.sync_state.clone()
    }

    pub async fn metrics(&self) -> SyncMetrics {
        self.inner.state.lock().await.metrics.clone()
    }

    /// Lifecycle state of the newest edit of an item
    ///
    /// Pending edits report `Local` or `InFlight`; otherwise the outcome of
    /// the last reconciled edit, if the item was ever edited.
    pub async fn mutation_state(&self, item_id: &str) -> Option<MutationState> {
        let state = self.inner.state.lock().await;
        if state.queue.contains(item_id) {
            Some(MutationState::Local)
        } else if state
            .in_flight
            .as_ref()
            .is_some_and(|batch| batch.item_ids().any(|id| id == item_id))
        {
            Some(MutationState::InFlight)
        } else {
            state.outcomes.get(item_id).copied()
        }
    }

    /// Rolled-back mutations available for `retry_failed`
    pub async fn failed_mutations(&self) -> Vec<FailedMutation> {
        self.inner.state.lock().await.retry.oldest_first()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Subscribe to store, stats and flush events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    /// Flush the queue now instead of waiting for the debounce delay
    pub async fn flush_now(&self) -> FlushOutcome {
        Self::flush_once(Arc::clone(&self.inner)).await
    }

    /// Re-queue rolled-back mutations the user has not edited since
    ///
    /// Returns how many mutations were queued again.
    pub async fn retry_failed(&self) -> Result<usize, EngineError> {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        if state.closed {
            return Err(EngineError::Closed);
        }

        let mut retried = 0;
        for failed in state.retry.oldest_first() {
            let item_id = failed.item_id.as_str();
            let untouched = !state.queue.contains(item_id) && !state.store.is_dirty(item_id);
            if !untouched {
                continue;
            }
            tracing::info!(
                "[SYNC] Retrying {} -> {} (attempt {})",
                item_id,
                failed.target,
                failed.attempts + 1
            );
            Self::enqueue_locked(&self.inner, state, item_id, failed.target);
            retried += 1;
        }
        Ok(retried)
    }

    /// Stop scheduling; results still in flight will be ignored
    pub async fn shutdown(&self) {
        let mut state = self.inner.state.lock().await;
        if state.closed {
            return;
        }
        state.closed = true;
        state.scheduler.cancel_timer();
        tracing::info!(
            "[SYNC] Engine shut down with {} unsynced edit(s)",
            state.sync_state.pending()
        );
    }

    fn enqueue_locked(
        inner: &Arc<EngineInner>,
        state: &mut EngineState,
        item_id: &str,
        status: ProblemStatus,
    ) {
        state.store.apply_optimistic(item_id, status);
        state.queue.enqueue(item_id, status);
        state.stats = project(&state.store, &inner.catalog);
        state.refresh_sync_state();

        inner.emit(EngineEvent::StatusChanged {
            item_id: item_id.to_string(),
            status,
        });
        inner.emit(EngineEvent::StatsChanged(state.stats.clone()));

        let decision = state.scheduler.on_enqueue(state.queue.len());
        Self::apply_decision(inner, state, decision);
    }

    fn apply_decision(inner: &Arc<EngineInner>, state: &mut EngineState, decision: ScheduleDecision) {
        match decision {
            ScheduleDecision::FlushNow => {
                tokio::spawn(Self::flush_once(Arc::clone(inner)));
            }
            ScheduleDecision::Debounce(delay) => Self::arm_debounce(inner, state, delay),
            ScheduleDecision::Idle => {}
        }
    }

    fn arm_debounce(inner: &Arc<EngineInner>, state: &mut EngineState, delay: Duration) {
        let generation = state.scheduler.next_generation();
        let deadline = tokio::time::Instant::now() + delay;
        let weak = Arc::downgrade(inner);

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            {
                let mut state = inner.state.lock().await;
                if !state.scheduler.timer_fired(generation) {
                    return;
                }
            }
            tracing::debug!("[SYNC] Debounce of {:?} elapsed, flushing", delay);
            Self::flush_once(inner).await;
        });

        state.scheduler.arm(generation, handle);
    }

    /// Send one batch and reconcile it
    fn flush_once(inner: Arc<EngineInner>) -> BoxFuture<'static, FlushOutcome> {
        Box::pin(async move {
            let batch = {
                let mut guard = inner.state.lock().await;
                let state = &mut *guard;
                if state.closed {
                    return FlushOutcome::Closed;
                }
                match state.scheduler.begin_flush(state.queue.len()) {
                    FlushPermit::Deferred => {
                        tracing::debug!("[SYNC] Flush already in flight, deferring");
                        return FlushOutcome::Deferred;
                    }
                    FlushPermit::Empty => return FlushOutcome::Empty,
                    FlushPermit::Granted => {}
                }

                let batch = state.queue.drain_snapshot();
                state.metrics.record_flush_start(batch.len());
                state.in_flight = Some(batch.clone());
                state.refresh_sync_state();
                inner.emit(EngineEvent::FlushStarted {
                    batch_id: batch.id(),
                    size: batch.len(),
                });
                batch
            };

            let result = inner.client.sync(&batch).await;

            let mut guard = inner.state.lock().await;
            let state = &mut *guard;
            if state.closed {
                tracing::debug!(
                    "[SYNC] Engine closed, ignoring result of batch {}",
                    batch.id()
                );
                return FlushOutcome::Closed;
            }

            let report = reconcile(
                &mut state.store,
                &state.queue,
                &inner.catalog,
                &batch,
                &result,
            );

            for item in &report.items {
                if let Some(terminal) = item.resolution.terminal_state() {
                    state.outcomes.insert(item.item_id.clone(), terminal);
                }
                match (&item.resolution, &report.error) {
                    (Resolution::RolledBack { .. }, Some(error)) => {
                        state.retry.record_failure(&item.item_id, item.target, error);
                    }
                    (Resolution::Confirmed, _) => {
                        state.retry.forget(&item.item_id);
                    }
                    _ => {}
                }
            }

            state.in_flight = None;
            state.metrics.record_flush_end(&report);
            match &report.error {
                None => {
                    state.sync_state.last_sync = Some(chrono::Utc::now());
                    state.sync_state.last_error = None;
                }
                Some(error) => state.sync_state.last_error = Some(error.to_string()),
            }

            let decision = state
                .scheduler
                .finish_flush(report.succeeded(), state.queue.len());
            state.stats = project(&state.store, &inner.catalog);
            state.refresh_sync_state();

            for item in &report.items {
                if let Resolution::RolledBack { restored } = item.resolution {
                    inner.emit(EngineEvent::StatusChanged {
                        item_id: item.item_id.clone(),
                        status: restored,
                    });
                }
            }
            inner.emit(EngineEvent::StatsChanged(state.stats.clone()));
            match &report.error {
                None => inner.emit(EngineEvent::FlushConfirmed(report.clone())),
                Some(error) => inner.emit(EngineEvent::FlushFailed {
                    error: error.clone(),
                    report: report.clone(),
                }),
            }

            Self::apply_decision(&inner, state, decision);
            FlushOutcome::Flushed(report)
        })
    }
}
