//! # Sync Metrics
//!
//! Counters for flushes and their outcomes, exposed for debugging panels.

use crate::dashboard::offline::ReconciliationReport;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct SyncMetrics {
    pub total_flushes: u64,
    pub successful_flushes: u64,
    pub failed_flushes: u64,
    /// Updates put on the wire
    pub items_sent: u64,
    pub items_rolled_back: u64,
    /// Results discarded because a newer local edit existed
    pub items_superseded: u64,
    pub average_flush_duration: Duration,
    pub last_flush_duration: Option<Duration>,
    last_flush_start: Option<Instant>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_flush_start(&mut self, batch_size: usize) {
        self.last_flush_start = Some(Instant::now());
        self.total_flushes += 1;
        self.items_sent += batch_size as u64;
    }

    pub fn record_flush_end(&mut self, report: &ReconciliationReport) {
        if let Some(start) = self.last_flush_start.take() {
            let duration = start.elapsed();
            self.last_flush_duration = Some(duration);

            // Rolling average over every completed flush
            let completed = u128::from(self.successful_flushes + self.failed_flushes + 1);
            let total = self.average_flush_duration.as_nanos() * (completed - 1) + duration.as_nanos();
            let average = u64::try_from(total / completed).unwrap_or(u64::MAX);
            self.average_flush_duration = Duration::from_nanos(average);
        }

        if report.succeeded() {
            self.successful_flushes += 1;
        } else {
            self.failed_flushes += 1;
        }
        self.items_rolled_back += report.rolled_back().len() as u64;
        self.items_superseded += report.superseded().len() as u64;
    }

    pub fn success_rate(&self) -> f64 {
        let completed = self.successful_flushes + self.failed_flushes;
        if completed == 0 {
            0.0
        } else {
            self.successful_flushes as f64 / completed as f64
        }
    }
}
