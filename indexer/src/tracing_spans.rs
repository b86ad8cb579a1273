//! Pre-built [`tracing::Span`] constructors for synchronizer work items.
//!
//! Using consistent span names and field sets makes it easy to filter and
//! correlate one account or one transaction across log lines.

use tracing::{info_span, Span};
use votesync_types::Address;

/// Span covering the decode and reconcile of one account observation.
pub fn account_span(address: &Address) -> Span {
    info_span!("account", address = %address)
}

/// Span covering the metadata lookup and event extraction of one transaction.
pub fn log_batch_span(signature: &str) -> Span {
    info_span!("log_batch", signature = %signature)
}

/// Span covering the startup backfill.
pub fn backfill_span(program_id: &Address) -> Span {
    info_span!("backfill", program = %program_id)
}

/// Span covering the application of one vote event.
pub fn vote_span(poll_id: &str, candidate: &str) -> Span {
    info_span!("vote", poll_id = %poll_id, candidate = %candidate)
}
