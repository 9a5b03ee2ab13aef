//! # Aggregate Stats
//!
//! Summary counts for the dashboard header and charts, derived from the
//! status store and the catalog on every change. There are no running
//! counters: `project` is recomputed from scratch, which is linear in the
//! catalog size.

use crate::dashboard::offline::StatusStore;
use crate::shared::catalog::{Catalog, Difficulty, ProblemStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: ProblemStatus) {
        match status {
            ProblemStatus::NotStarted => self.not_started += 1,
            ProblemStatus::InProgress => self.in_progress += 1,
            ProblemStatus::Completed => self.completed += 1,
        }
    }

    pub fn get(&self, status: ProblemStatus) -> usize {
        match status {
            ProblemStatus::NotStarted => self.not_started,
            ProblemStatus::InProgress => self.in_progress,
            ProblemStatus::Completed => self.completed,
        }
    }

    pub fn total(&self) -> usize {
        self.not_started + self.in_progress + self.completed
    }

    /// Share of completed items, 0.0 to 100.0
    pub fn completion_percent(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.completed as f64 * 100.0 / total as f64,
        }
    }
}

/// Dashboard summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    /// Catalog size
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub by_category: BTreeMap<String, StatusCounts>,
    pub by_difficulty: BTreeMap<Difficulty, StatusCounts>,
}

impl AggregateStats {
    pub fn counts(&self) -> StatusCounts {
        StatusCounts {
            not_started: self.not_started,
            in_progress: self.in_progress,
            completed: self.completed,
        }
    }

    pub fn completion_percent(&self) -> f64 {
        self.counts().completion_percent()
    }
}

/// Count every catalog item by its shown status
///
/// Store entries for ids outside the catalog do not count.
pub fn project(store: &StatusStore, catalog: &Catalog) -> AggregateStats {
    let mut counts = StatusCounts::default();
    let mut by_category: BTreeMap<String, StatusCounts> = BTreeMap::new();
    let mut by_difficulty: BTreeMap<Difficulty, StatusCounts> = BTreeMap::new();

    for item in catalog.iter() {
        let status = store.get(&item.id);
        counts.add(status);
        by_category.entry(item.category.clone()).or_default().add(status);
        by_difficulty.entry(item.difficulty).or_default().add(status);
    }

    AggregateStats {
        total: catalog.len(),
        not_started: counts.not_started,
        in_progress: counts.in_progress,
        completed: counts.completed,
        by_category,
        by_difficulty,
    }
}
