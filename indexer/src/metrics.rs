//! Prometheus metrics for the synchronizer.
//!
//! The [`SyncMetrics`] struct owns a dedicated [`Registry`] that the API's
//! `/metrics` endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

pub struct SyncMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    /// Poll and candidate observations written to the store.
    pub accounts_applied: IntCounter,
    /// Vote events reconciled into a tally increment and a vote row.
    pub vote_events_applied: IntCounter,
    /// Accounts skipped because their buffer did not match the layout.
    pub decode_failures: IntCounter,
    /// Items skipped because a store write failed.
    pub store_failures: IntCounter,
    /// Candidates moved from unlinked to linked, by votes or repair.
    pub candidates_linked: IntCounter,
    /// Items waiting in the ingestion channel.
    pub ingest_queue_depth: IntGauge,
}

impl SyncMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let accounts_applied = register_int_counter_with_registry!(
            Opts::new(
                "votesync_accounts_applied_total",
                "Poll and candidate accounts reconciled into the store"
            ),
            registry
        )
        .expect("failed to register accounts_applied counter");

        let vote_events_applied = register_int_counter_with_registry!(
            Opts::new(
                "votesync_vote_events_applied_total",
                "Vote events reconciled into the store"
            ),
            registry
        )
        .expect("failed to register vote_events_applied counter");

        let decode_failures = register_int_counter_with_registry!(
            Opts::new(
                "votesync_decode_failures_total",
                "Account buffers that failed to decode"
            ),
            registry
        )
        .expect("failed to register decode_failures counter");

        let store_failures = register_int_counter_with_registry!(
            Opts::new(
                "votesync_store_failures_total",
                "Items skipped after a store error"
            ),
            registry
        )
        .expect("failed to register store_failures counter");

        let candidates_linked = register_int_counter_with_registry!(
            Opts::new(
                "votesync_candidates_linked_total",
                "Candidates linked to their poll"
            ),
            registry
        )
        .expect("failed to register candidates_linked counter");

        let ingest_queue_depth = register_int_gauge_with_registry!(
            Opts::new(
                "votesync_ingest_queue_depth",
                "Items waiting for the reconciliation worker"
            ),
            registry
        )
        .expect("failed to register ingest_queue_depth gauge");

        Self {
            registry,
            accounts_applied,
            vote_events_applied,
            decode_failures,
            store_failures,
            candidates_linked,
            ingest_queue_depth,
        }
    }

    /// Encode every metric in the Prometheus text format.
    pub fn encode_text(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}
