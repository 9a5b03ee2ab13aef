//! Scheduling, rollback and event tests for `SyncEngine`
//!
//! All timer tests run on a paused clock; `settle` lets spawned flush tasks
//! finish without moving time.

use crate::common::*;
use crate::{assert_ok, assert_stats_consistent, assert_status};
use assert_matches::assert_matches;
use dsatrack::dashboard::offline::MutationState;
use dsatrack::dashboard::{next_event, EngineEvent, FlushOutcome};
use dsatrack::shared::{EngineError, ProblemStatus, SyncConfig, SyncError};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::time::advance;

#[tokio::test(start_paused = true)]
async fn test_coalescing_sends_only_final_value() {
    let endpoint = MockEndpoint::new();
    let engine = lettered_engine(endpoint.clone(), 10);

    for status in [
        ProblemStatus::InProgress,
        ProblemStatus::Completed,
        ProblemStatus::InProgress,
    ] {
        assert_ok!(engine.set_status("A", status).await);
    }

    assert_eq!(engine.pending_count().await, 1);
    assert_eq!(engine.mutation_state("A").await, Some(MutationState::Local));

    advance(Duration::from_millis(DEBOUNCE_MS)).await;
    settle().await;

    assert_eq!(endpoint.request_count(), 1);
    assert_eq!(
        endpoint.sent_updates(),
        vec![("A".to_string(), ProblemStatus::InProgress)]
    );
    assert_eq!(engine.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_threshold_flush_skips_debounce() {
    let endpoint = MockEndpoint::new();
    let engine = lettered_engine(endpoint.clone(), 10);

    for id in ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"] {
        assert_ok!(engine.set_status(id, ProblemStatus::Completed).await);
    }
    settle().await;

    assert_eq!(endpoint.request_count(), 1);
    assert_eq!(endpoint.requests()[0].updates.len(), 10);
    assert_eq!(engine.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_flush_waits_full_interval() {
    let endpoint = MockEndpoint::new();
    let engine = lettered_engine(endpoint.clone(), 10);

    for id in ["A", "B", "C"] {
        assert_ok!(engine.set_status(id, ProblemStatus::InProgress).await);
    }

    advance(Duration::from_millis(DEBOUNCE_MS - 1)).await;
    settle().await;
    assert_eq!(endpoint.request_count(), 0);

    advance(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(endpoint.request_count(), 1);
    assert_eq!(endpoint.requests()[0].updates.len(), 3);

    // Exactly one flush
    advance(Duration::from_secs(30)).await;
    settle().await;
    assert_eq!(endpoint.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_new_edit_restarts_debounce() {
    let endpoint = MockEndpoint::new();
    let engine = lettered_engine(endpoint.clone(), 10);

    assert_ok!(engine.set_status("A", ProblemStatus::Completed).await);
    advance(Duration::from_millis(1500)).await;
    settle().await;

    assert_ok!(engine.set_status("B", ProblemStatus::Completed).await);
    advance(Duration::from_millis(1500)).await;
    settle().await;
    assert_eq!(endpoint.request_count(), 0);

    advance(Duration::from_millis(500)).await;
    settle().await;
    assert_eq!(endpoint.request_count(), 1);
    assert_eq!(endpoint.requests()[0].updates.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_batch_of_two_scenario() {
    let endpoint = MockEndpoint::new();
    let engine = lettered_engine(endpoint.clone(), 2);

    assert_ok!(engine.set_status("A", ProblemStatus::Completed).await);
    assert_ok!(engine.set_status("B", ProblemStatus::InProgress).await);
    settle().await;

    assert_eq!(endpoint.request_count(), 1);
    assert_eq!(
        endpoint.sent_updates(),
        vec![
            ("A".to_string(), ProblemStatus::Completed),
            ("B".to_string(), ProblemStatus::InProgress),
        ]
    );

    assert_ok!(engine.set_status("C", ProblemStatus::Completed).await);
    settle().await;
    assert_eq!(endpoint.request_count(), 1);

    advance(Duration::from_millis(DEBOUNCE_MS)).await;
    settle().await;
    assert_eq!(endpoint.request_count(), 2);
    assert_eq!(endpoint.requests()[1].updates.len(), 1);
    assert_eq!(endpoint.requests()[1].updates[0].item_id, "C");
}

#[tokio::test(start_paused = true)]
async fn test_optimistic_stats_before_network() {
    let endpoint = MockEndpoint::gated();
    let engine = engine_with(lettered_catalog(3), Vec::new(), endpoint.clone(), test_config(10));

    assert_ok!(engine.set_status("A", ProblemStatus::Completed).await);

    let stats = engine.aggregate_stats().await;
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.in_progress, 0);
    assert_eq!(stats.not_started, 2);
    assert_eq!(endpoint.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failure_rolls_back_to_confirmed() {
    let endpoint = MockEndpoint::new();
    let engine = engine_with(
        lettered_catalog(3),
        vec![
            confirmed("A", ProblemStatus::NotStarted),
            confirmed("B", ProblemStatus::InProgress),
        ],
        endpoint.clone(),
        test_config(10),
    );
    let mut events = engine.subscribe();

    endpoint.fail_next(SyncError::transport("connection reset"));
    assert_ok!(engine.set_status("A", ProblemStatus::Completed).await);
    assert_ok!(engine.set_status("B", ProblemStatus::Completed).await);
    assert_eq!(engine.aggregate_stats().await.completed, 2);

    let outcome = engine.flush_now().await;
    let report = assert_matches!(outcome, FlushOutcome::Flushed(report) => report);
    assert_eq!(report.rolled_back(), vec!["A".to_string(), "B".to_string()]);

    assert_status!(engine,
        "A" => ProblemStatus::NotStarted,
        "B" => ProblemStatus::InProgress,
    );
    let stats = engine.aggregate_stats().await;
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.in_progress, 1);
    assert_stats_consistent!(stats, 3);

    let mut toast = None;
    while let Ok(event) = events.try_recv() {
        if let EngineEvent::FlushFailed { error, report } = event {
            toast = Some((error, report.rolled_back()));
        }
    }
    let (error, rolled_back) = toast.expect("rollback should raise a FlushFailed event");
    assert_eq!(error, SyncError::transport("connection reset"));
    assert_eq!(rolled_back.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rejection_handled_like_transport_failure() {
    let endpoint = MockEndpoint::new();
    let engine = lettered_engine(endpoint.clone(), 10);

    endpoint.fail_next(SyncError::rejected(403, "forbidden"));
    assert_ok!(engine.set_status("A", ProblemStatus::Completed).await);
    engine.flush_now().await;

    assert_status!(engine, "A" => ProblemStatus::NotStarted);
    let state = engine.sync_state().await;
    assert_eq!(state.consecutive_failures, 1);
    assert!(state.last_error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_hung_request_times_out_and_rolls_back() {
    // Gate is never opened
    let endpoint = MockEndpoint::gated();
    let engine = lettered_engine(endpoint.clone(), 10);

    assert_ok!(engine.set_status("A", ProblemStatus::Completed).await);
    let outcome = engine.flush_now().await;

    let report = assert_matches!(outcome, FlushOutcome::Flushed(report) => report);
    assert_matches!(report.error, Some(SyncError::Timeout { timeout_ms: 10_000 }));
    assert_status!(engine, "A" => ProblemStatus::NotStarted);
}

#[tokio::test(start_paused = true)]
async fn test_events_follow_each_change() {
    let endpoint = MockEndpoint::new();
    let engine = lettered_engine(endpoint.clone(), 10);
    let mut events = engine.subscribe();

    assert_ok!(engine.set_status("C", ProblemStatus::InProgress).await);

    assert_matches!(
        events.try_recv(),
        Ok(EngineEvent::StatusChanged { item_id, status: ProblemStatus::InProgress }) if item_id == "C"
    );
    let stats = assert_matches!(events.try_recv(), Ok(EngineEvent::StatsChanged(stats)) => stats);
    assert_eq!(stats.in_progress, 1);

    engine.flush_now().await;
    assert_matches!(events.try_recv(), Ok(EngineEvent::FlushStarted { size: 1, .. }));
    assert_matches!(events.try_recv(), Ok(EngineEvent::StatsChanged(_)));
    let report = assert_matches!(events.try_recv(), Ok(EngineEvent::FlushConfirmed(report)) => report);
    assert_eq!(report.confirmed(), vec!["C".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_item_leaves_state_untouched() {
    let endpoint = MockEndpoint::new();
    let engine = lettered_engine(endpoint.clone(), 1);

    let result = engine.set_status("nope", ProblemStatus::Completed).await;
    assert_matches!(result, Err(EngineError::UnknownItem(id)) if id == "nope");

    settle().await;
    assert_eq!(engine.pending_count().await, 0);
    assert_eq!(endpoint.request_count(), 0);
    assert_stats_consistent!(engine.aggregate_stats().await, 12);
}

#[tokio::test(start_paused = true)]
async fn test_same_as_confirmed_is_still_sent() {
    let endpoint = MockEndpoint::new();
    let engine = engine_with(
        lettered_catalog(3),
        vec![confirmed("A", ProblemStatus::Completed)],
        endpoint.clone(),
        test_config(10),
    );

    assert_ok!(engine.set_status("A", ProblemStatus::Completed).await);
    engine.flush_now().await;

    assert_eq!(
        endpoint.sent_updates(),
        vec![("A".to_string(), ProblemStatus::Completed)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_manual_retry_resends_rolled_back_edit() {
    let endpoint = MockEndpoint::new();
    let engine = lettered_engine(endpoint.clone(), 10);

    endpoint.fail_next(SyncError::transport("offline"));
    assert_ok!(engine.set_status("A", ProblemStatus::Completed).await);
    engine.flush_now().await;
    assert_status!(engine, "A" => ProblemStatus::NotStarted);

    let failed = engine.failed_mutations().await;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].attempts, 1);

    assert_eq!(assert_ok!(engine.retry_failed().await), 1);
    assert_status!(engine, "A" => ProblemStatus::Completed);

    engine.flush_now().await;
    assert_eq!(endpoint.request_count(), 2);
    assert!(engine.failed_mutations().await.is_empty());
    assert_status!(engine, "A" => ProblemStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_retry_failures_count_attempts() {
    let endpoint = MockEndpoint::new();
    let engine = lettered_engine(endpoint.clone(), 10);

    endpoint.fail_next(SyncError::transport("offline"));
    endpoint.fail_next(SyncError::transport("still offline"));
    assert_ok!(engine.set_status("A", ProblemStatus::Completed).await);
    engine.flush_now().await;
    assert_ok!(engine.retry_failed().await);
    engine.flush_now().await;

    let failed = engine.failed_mutations().await;
    assert_eq!(failed[0].attempts, 2);
    assert_eq!(failed[0].last_error, SyncError::transport("still offline"));
}

#[tokio::test(start_paused = true)]
async fn test_user_edit_clears_retry_entry() {
    let endpoint = MockEndpoint::new();
    let engine = lettered_engine(endpoint.clone(), 10);

    endpoint.fail_next(SyncError::transport("offline"));
    assert_ok!(engine.set_status("A", ProblemStatus::Completed).await);
    engine.flush_now().await;

    assert_ok!(engine.set_status("A", ProblemStatus::InProgress).await);
    assert!(engine.failed_mutations().await.is_empty());
    assert_eq!(assert_ok!(engine.retry_failed().await), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failures_stretch_debounce() {
    let endpoint = MockEndpoint::new();
    let engine = lettered_engine(endpoint.clone(), 10);

    endpoint.fail_next(SyncError::transport("offline"));
    assert_ok!(engine.set_status("A", ProblemStatus::Completed).await);
    engine.flush_now().await;
    assert_eq!(endpoint.request_count(), 1);

    // One failure: delay is max(2s, 4s backoff)
    assert_ok!(engine.set_status("B", ProblemStatus::Completed).await);
    advance(Duration::from_millis(DEBOUNCE_MS)).await;
    settle().await;
    assert_eq!(endpoint.request_count(), 1);

    advance(Duration::from_millis(2000)).await;
    settle().await;
    assert_eq!(endpoint.request_count(), 2);
    assert_eq!(engine.sync_state().await.consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_ignores_in_flight_result() {
    let endpoint = MockEndpoint::gated();
    endpoint.fail_next(SyncError::transport("offline"));
    let engine = lettered_engine(endpoint.clone(), 1);

    assert_ok!(engine.set_status("A", ProblemStatus::Completed).await);
    settle().await;
    assert_eq!(engine.mutation_state("A").await, Some(MutationState::InFlight));

    engine.shutdown().await;
    endpoint.release(1);
    settle().await;

    // No rollback after teardown
    assert_eq!(endpoint.completed_count(), 1);
    assert_status!(engine, "A" => ProblemStatus::Completed);
    assert_matches!(
        engine.set_status("B", ProblemStatus::Completed).await,
        Err(EngineError::Closed)
    );
    assert_matches!(engine.retry_failed().await, Err(EngineError::Closed));
}

#[tokio::test(start_paused = true)]
async fn test_metrics_track_flushes() {
    let endpoint = MockEndpoint::new();
    let engine = lettered_engine(endpoint.clone(), 10);

    assert_ok!(engine.set_status("A", ProblemStatus::Completed).await);
    assert_ok!(engine.set_status("B", ProblemStatus::Completed).await);
    engine.flush_now().await;

    endpoint.fail_next(SyncError::transport("offline"));
    assert_ok!(engine.set_status("C", ProblemStatus::Completed).await);
    engine.flush_now().await;

    let metrics = engine.metrics().await;
    assert_eq!(metrics.total_flushes, 2);
    assert_eq!(metrics.items_sent, 3);
    assert_eq!(metrics.successful_flushes, 1);
    assert_eq!(metrics.failed_flushes, 1);
    assert_eq!(metrics.items_rolled_back, 1);
}

#[tokio::test(start_paused = true)]
async fn test_lagging_subscriber_still_sees_rollback() {
    let endpoint = MockEndpoint::new();
    let config = SyncConfig::builder()
        .max_batch_size(10)
        .debounce(Duration::from_millis(DEBOUNCE_MS))
        .event_capacity(4)
        .build()
        .unwrap();
    let engine = engine_with(lettered_catalog(3), Vec::new(), endpoint.clone(), config);
    let mut events = engine.subscribe();

    // Far more events than the channel holds
    for id in ["A", "B", "C"] {
        assert_ok!(engine.set_status(id, ProblemStatus::Completed).await);
    }
    endpoint.fail_next(SyncError::transport("offline"));
    engine.flush_now().await;

    let mut received = 0;
    let mut toast = None;
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_secs(1), next_event(&mut events)).await
    {
        received += 1;
        if let EngineEvent::FlushFailed { report, .. } = event {
            toast = Some(report.rolled_back());
            break;
        }
    }

    assert!(received > 0);
    assert_eq!(
        toast,
        Some(vec!["A".to_string(), "B".to_string(), "C".to_string()])
    );
}
