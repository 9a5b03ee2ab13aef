//! Dashboard Progress Engine
//!
//! Client side of the problem-status dashboard: optimistic status edits,
//! batched pushes to the progress server, reconciliation and the aggregate
//! stats shown in the header and charts.
//!
//! # Module Structure
//!
//! ```text
//! dashboard/
//! ├── mod.rs             - Module exports and documentation
//! ├── main.rs            - Console front-end (binary)
//! ├── config.rs          - Server URL, token, env overrides
//! ├── providers.rs       - Catalog and confirmed-status sources
//! ├── progress_client.rs - HTTP client for the progress API
//! ├── stats.rs           - Aggregate stats projection
//! ├── offline/           - Status store, queue, reconciliation, retry ledger
//! └── sync/              - Scheduler, sync client, engine façade
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! // Run the console front-end:
//! // cargo run --bin tracker-sync
//! ```

pub mod config;
pub mod offline;
pub mod progress_client;
pub mod providers;
pub mod stats;
pub mod sync;

pub use config::Config;
pub use progress_client::HttpProgressClient;
pub use providers::{CatalogProvider, StaticCatalog, StaticStatuses, StatusProvider};
pub use stats::{project, AggregateStats, StatusCounts};
pub use sync::{next_event, EngineEvent, FlushOutcome, ProgressEndpoint, SyncEngine, SyncState};
