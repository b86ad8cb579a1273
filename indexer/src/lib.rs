//! Chain-state synchronizer for the voting program.
//!
//! The synchronizer:
//! - Snapshots every poll and candidate account on startup (backfill)
//! - Follows account changes and transaction logs live
//! - Decodes accounts and vote events into typed records
//! - Derives program addresses to link candidates to their polls
//! - Reconciles everything into the store with idempotent upserts

pub mod backfill;
pub mod config;
pub mod error;
pub mod live;
pub mod logging;
pub mod metadata;
pub mod metrics;
pub mod reconcile;
pub mod repair;
pub mod shutdown;
pub mod synchronizer;
pub mod tracing_spans;

pub use backfill::{run_backfill, BackfillReport};
pub use config::IndexerConfig;
pub use error::SyncError;
pub use live::IngestItem;
pub use logging::{init_logging, LogFormat};
pub use metadata::MetadataResolver;
pub use metrics::SyncMetrics;
pub use reconcile::{Reconciler, Stores, VoteOutcome};
pub use repair::{RepairReport, ReverseLinker};
pub use shutdown::{ShutdownController, ShutdownReason};
pub use synchronizer::Synchronizer;
