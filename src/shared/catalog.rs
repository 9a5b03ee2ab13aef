//! Problem Catalog Types
//!
//! The immutable list of tracked problems and the closed set of statuses a
//! student can assign to each of them.
//!
//! # Usage
//!
//! ```rust
//! use dsatrack::shared::catalog::{Catalog, Difficulty, Item, ProblemStatus};
//!
//! let catalog = Catalog::new(vec![
//!     Item::new("two-sum", "Two Sum", "Arrays", Difficulty::Easy),
//! ]);
//! assert!(catalog.contains("two-sum"));
//! assert_eq!(ProblemStatus::default(), ProblemStatus::NotStarted);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Identifier of a catalog item
pub type ItemId = String;

/// Progress status of a single problem
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemStatus {
    /// No recorded progress (also the value of absent records)
    #[default]
    NotStarted,
    /// Student is working on the problem
    InProgress,
    /// Problem solved
    Completed,
}

impl ProblemStatus {
    /// All statuses, in display order
    pub const ALL: [ProblemStatus; 3] = [
        ProblemStatus::NotStarted,
        ProblemStatus::InProgress,
        ProblemStatus::Completed,
    ];

    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemStatus::NotStarted => "not_started",
            ProblemStatus::InProgress => "in_progress",
            ProblemStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ProblemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProblemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "not_started" => Ok(ProblemStatus::NotStarted),
            "in_progress" => Ok(ProblemStatus::InProgress),
            "completed" => Ok(ProblemStatus::Completed),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// Difficulty tier of a problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Immutable catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier
    pub id: ItemId,
    /// Display title
    pub title: String,
    /// Topic category (e.g. "Arrays", "Graphs")
    pub category: String,
    /// Difficulty tier
    pub difficulty: Difficulty,
}

impl Item {
    /// Create a new catalog item
    pub fn new(
        id: impl Into<ItemId>,
        title: impl Into<String>,
        category: impl Into<String>,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: category.into(),
            difficulty,
        }
    }
}

/// The item catalog of a dashboard session
///
/// Loaded once and never mutated. Lookups by id are constant time; iteration
/// preserves the order the provider supplied.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Item>,
    index: HashMap<ItemId, usize>,
}

impl Catalog {
    /// Build a catalog; later duplicates of an id are dropped
    pub fn new(items: Vec<Item>) -> Self {
        let mut unique = Vec::with_capacity(items.len());
        let mut index = HashMap::with_capacity(items.len());

        for item in items {
            if index.contains_key(&item.id) {
                tracing::warn!("[CATALOG] Duplicate item id {}, keeping first entry", item.id);
                continue;
            }
            index.insert(item.id.clone(), unique.len());
            unique.push(item);
        }

        Self { items: unique, index }
    }

    /// Look up an item by id
    pub fn get(&self, item_id: &str) -> Option<&Item> {
        self.index.get(item_id).map(|&pos| &self.items[pos])
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.index.contains_key(item_id)
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate items in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }
}
