//! Progress API Wire Types
//!
//! JSON bodies exchanged with the progress server. Field names are camelCase
//! on the wire.
//!
//! ```json
//! { "updates": [ { "itemId": "two-sum", "status": "completed" } ] }
//! ```

use crate::shared::catalog::{ItemId, ProblemStatus};
use serde::{Deserialize, Serialize};

/// One `{itemId, status}` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub item_id: ItemId,
    pub status: ProblemStatus,
}

impl StatusUpdate {
    pub fn new(item_id: impl Into<ItemId>, status: ProblemStatus) -> Self {
        Self {
            item_id: item_id.into(),
            status,
        }
    }
}

/// Body of `POST /api/progress/batch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub updates: Vec<StatusUpdate>,
}

/// Acknowledgement returned by the batch endpoint
///
/// Servers that answer with an empty body are treated as a plain success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAck {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Number of rows the server wrote, when reported
    #[serde(default)]
    pub updated: Option<usize>,
}

fn default_success() -> bool {
    true
}

impl Default for BatchAck {
    fn default() -> Self {
        Self {
            success: true,
            message: None,
            updated: None,
        }
    }
}

/// Server-confirmed status row, as returned by `GET /api/progress`
pub type ConfirmedStatus = StatusUpdate;
