//! In-flight race tests
//!
//! A gated endpoint holds each batch until the test releases it, so edits can
//! be made while a request is outstanding.

use crate::common::*;
use crate::{assert_ok, assert_status};
use dsatrack::dashboard::offline::MutationState;
use dsatrack::dashboard::FlushOutcome;
use dsatrack::shared::{BatchAck, ProblemStatus, SyncError};
use pretty_assertions::assert_eq;

#[tokio::test(start_paused = true)]
async fn test_success_does_not_overwrite_newer_edit() {
    let endpoint = MockEndpoint::gated();
    let engine = lettered_engine(endpoint.clone(), 1);

    assert_ok!(engine.set_status("K", ProblemStatus::Completed).await);
    settle().await;
    assert_eq!(engine.mutation_state("K").await, Some(MutationState::InFlight));

    // Newer edit while the first batch is outstanding
    assert_ok!(engine.set_status("K", ProblemStatus::InProgress).await);
    settle().await;
    assert_eq!(endpoint.request_count(), 1);
    assert_eq!(engine.pending_count().await, 2);

    endpoint.release(1);
    settle().await;
    assert_status!(engine, "K" => ProblemStatus::InProgress);

    // Deferred follow-up flush carries the newer value
    assert_eq!(endpoint.request_count(), 2);
    assert_eq!(engine.mutation_state("K").await, Some(MutationState::InFlight));

    endpoint.release(1);
    settle().await;
    assert_eq!(
        endpoint.sent_updates(),
        vec![
            ("K".to_string(), ProblemStatus::Completed),
            ("K".to_string(), ProblemStatus::InProgress),
        ]
    );
    assert_status!(engine, "K" => ProblemStatus::InProgress);
    assert_eq!(engine.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_failure_does_not_roll_back_newer_edit() {
    let endpoint = MockEndpoint::gated();
    endpoint.fail_next(SyncError::transport("offline"));
    let engine = lettered_engine(endpoint.clone(), 1);

    assert_ok!(engine.set_status("K", ProblemStatus::Completed).await);
    settle().await;
    assert_ok!(engine.set_status("K", ProblemStatus::InProgress).await);

    endpoint.release(1);
    settle().await;
    assert_status!(engine, "K" => ProblemStatus::InProgress);
    assert!(engine.failed_mutations().await.is_empty());

    endpoint.release(1);
    settle().await;
    assert_status!(engine, "K" => ProblemStatus::InProgress);
    assert_eq!(engine.sync_state().await.consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_back_during_flight_is_not_rolled_back() {
    let endpoint = MockEndpoint::gated();
    endpoint.fail_next(SyncError::transport("offline"));
    let engine = lettered_engine(endpoint.clone(), 1);

    // In-flight target and the newest edit end up equal
    assert_ok!(engine.set_status("K", ProblemStatus::Completed).await);
    settle().await;
    assert_ok!(engine.set_status("K", ProblemStatus::InProgress).await);
    assert_ok!(engine.set_status("K", ProblemStatus::Completed).await);

    endpoint.release(1);
    settle().await;
    assert_status!(engine, "K" => ProblemStatus::Completed);
    assert_eq!(engine.mutation_state("K").await, Some(MutationState::InFlight));

    endpoint.release(1);
    settle().await;
    assert_eq!(endpoint.request_count(), 2);
    assert_status!(engine, "K" => ProblemStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_confirmed_value_becomes_rollback_target() {
    let endpoint = MockEndpoint::gated();
    endpoint.push_response(Ok(BatchAck::default()));
    endpoint.fail_next(SyncError::transport("offline"));
    let engine = lettered_engine(endpoint.clone(), 1);

    assert_ok!(engine.set_status("K", ProblemStatus::Completed).await);
    settle().await;
    assert_ok!(engine.set_status("K", ProblemStatus::InProgress).await);

    // First batch succeeds but is superseded; second fails
    endpoint.release(2);
    settle().await;

    assert_eq!(endpoint.request_count(), 2);
    assert_status!(engine, "K" => ProblemStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_single_flight_with_accumulating_queue() {
    let endpoint = MockEndpoint::gated();
    let engine = lettered_engine(endpoint.clone(), 2);

    for id in ["A", "B"] {
        assert_ok!(engine.set_status(id, ProblemStatus::Completed).await);
    }
    settle().await;
    assert_eq!(endpoint.request_count(), 1);

    // Threshold reached twice more while the first batch is held
    for id in ["C", "D", "E", "F"] {
        assert_ok!(engine.set_status(id, ProblemStatus::InProgress).await);
        settle().await;
    }
    assert_eq!(endpoint.request_count(), 1);
    assert_eq!(engine.flush_now().await, FlushOutcome::Deferred);

    let state = engine.sync_state().await;
    assert!(state.is_syncing);
    assert_eq!(state.in_flight, 2);
    assert_eq!(state.queued, 4);

    endpoint.release(1);
    settle().await;
    assert_eq!(endpoint.request_count(), 2);
    assert_eq!(endpoint.requests()[1].updates.len(), 4);
    assert!(endpoint.request_count() - endpoint.completed_count() <= 1);

    endpoint.release(1);
    settle().await;
    assert_eq!(endpoint.completed_count(), 2);
    assert_eq!(engine.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_is_not_extended_by_later_edits() {
    let endpoint = MockEndpoint::gated();
    let engine = lettered_engine(endpoint.clone(), 10);

    assert_ok!(engine.set_status("A", ProblemStatus::Completed).await);
    let flush = tokio::spawn({
        let engine = engine.clone();
        async move { engine.flush_now().await }
    });
    settle().await;

    assert_ok!(engine.set_status("B", ProblemStatus::Completed).await);
    endpoint.release(1);
    settle().await;

    let outcome = assert_ok!(flush.await);
    let FlushOutcome::Flushed(report) = outcome else {
        panic!("expected a flush, got {:?}", outcome);
    };
    assert_eq!(report.items.len(), 1);
    assert_eq!(endpoint.requests()[0].updates.len(), 1);
    assert_eq!(engine.mutation_state("B").await, Some(MutationState::Local));
}
