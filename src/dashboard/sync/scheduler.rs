//! # Batch Scheduler
//!
//! Decides when the pending queue is flushed.
//!
//! - queue size reaches `max_batch_size` → flush now, cancelling the timer
//! - otherwise → (re)start the debounce timer
//! - a flush requested while another is in flight is deferred; when the
//!   in-flight flush has been reconciled the scheduler flushes again at once
//!   if anything is queued
//!
//! The scheduler owns the single debounce timer handle. Each arming gets a
//! new generation number, so a timer that lost a race with a newer arming or
//! with a flush cannot trigger anything when it wakes up.

use crate::dashboard::offline::retry::Backoff;
use crate::shared::config::SyncConfig;
use std::time::Duration;
use tokio::task::JoinHandle;

/// What the engine should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// Start a flush right away
    FlushNow,
    /// Arm the debounce timer with this delay
    Debounce(Duration),
    /// Nothing to do
    Idle,
}

/// Result of asking to start a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPermit {
    /// Caller may drain the queue and send
    Granted,
    /// Another flush is in flight; a follow-up flush is scheduled
    Deferred,
    /// Queue is empty
    Empty,
}

/// Flush timing state machine
#[derive(Debug)]
pub struct BatchScheduler {
    max_batch_size: usize,
    debounce: Duration,
    backoff: Backoff,
    consecutive_failures: u32,
    in_flight: bool,
    deferred: bool,
    generation: u64,
    timer: Option<(u64, JoinHandle<()>)>,
}

impl BatchScheduler {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            max_batch_size: config.max_batch_size,
            debounce: config.debounce,
            backoff: Backoff::new(config.backoff_base, config.backoff_max),
            consecutive_failures: 0,
            in_flight: false,
            deferred: false,
            generation: 0,
            timer: None,
        }
    }

    /// Called after every enqueue with the new queue size
    pub fn on_enqueue(&mut self, queue_len: usize) -> ScheduleDecision {
        if queue_len >= self.max_batch_size {
            self.cancel_timer();
            tracing::debug!("[SYNC] Queue reached {} item(s), flushing now", queue_len);
            ScheduleDecision::FlushNow
        } else {
            ScheduleDecision::Debounce(self.current_delay())
        }
    }

    /// Debounce delay, stretched by backoff after failed flushes
    pub fn current_delay(&self) -> Duration {
        self.debounce
            .max(self.backoff.delay_for(self.consecutive_failures))
    }

    /// Ask to start a flush
    pub fn begin_flush(&mut self, queue_len: usize) -> FlushPermit {
        if self.in_flight {
            self.deferred = true;
            return FlushPermit::Deferred;
        }
        if queue_len == 0 {
            return FlushPermit::Empty;
        }
        self.cancel_timer();
        self.in_flight = true;
        FlushPermit::Granted
    }

    /// Called once the in-flight flush has been reconciled
    pub fn finish_flush(&mut self, succeeded: bool, queue_len: usize) -> ScheduleDecision {
        self.in_flight = false;
        let deferred = std::mem::take(&mut self.deferred);

        if succeeded {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }

        if queue_len == 0 {
            ScheduleDecision::Idle
        } else if deferred || queue_len >= self.max_batch_size {
            ScheduleDecision::FlushNow
        } else if self.timer.is_none() {
            ScheduleDecision::Debounce(self.current_delay())
        } else {
            ScheduleDecision::Idle
        }
    }

    /// Reserve a generation for a timer about to be spawned
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Install a freshly spawned timer, aborting the previous one
    pub fn arm(&mut self, generation: u64, handle: JoinHandle<()>) {
        self.cancel_timer();
        self.timer = Some((generation, handle));
    }

    /// Called by a timer task when it wakes up
    ///
    /// Returns `false` if the timer was superseded and must not flush. The
    /// handle is released without aborting, since the caller is that task.
    pub fn timer_fired(&mut self, generation: u64) -> bool {
        match &self.timer {
            Some((current, _)) if *current == generation => {
                self.timer = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel_timer(&mut self) {
        if let Some((_, handle)) = self.timer.take() {
            handle.abort();
        }
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

impl Drop for BatchScheduler {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
