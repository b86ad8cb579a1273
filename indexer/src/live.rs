//! Live streaming.
//!
//! Two stream tasks turn subscription items into [`IngestItem`]s and push
//! them onto one bounded channel. A single worker drains the channel and
//! applies items in arrival order, so no two writes to the same row race.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn, Instrument};
use votesync_codec::vote_events;
use votesync_crypto::AccountKind;
use votesync_ledger_client::{KeyedAccount, LedgerClient, LogBatch, Subscription};
use votesync_types::{Address, TxMeta, VoteEvent};

use crate::tracing_spans::{account_span, log_batch_span, vote_span};
use crate::{
    MetadataResolver, Reconciler, ReverseLinker, ShutdownReason, SyncError, SyncMetrics,
};

/// Upper bound on each unsubscribe during teardown.
pub const UNSUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(2);

/// One unit of work for the reconciliation worker.
#[derive(Clone, Debug)]
pub enum IngestItem {
    Account(KeyedAccount),
    Vote {
        event: VoteEvent,
        meta: TxMeta,
        signature: String,
    },
}

async fn push(tx: &mpsc::Sender<IngestItem>, item: IngestItem, metrics: &SyncMetrics) -> bool {
    if tx.send(item).await.is_err() {
        return false;
    }
    metrics
        .ingest_queue_depth
        .set((tx.max_capacity() - tx.capacity()) as i64);
    true
}

async fn close<T>(subscription: Subscription<T>, stream: &'static str) {
    if let Err(e) = subscription.unsubscribe(UNSUBSCRIBE_TIMEOUT).await {
        debug!(stream, error = %e, "unsubscribe failed");
    }
}

/// Forward account changes until shutdown or until the stream ends.
pub(crate) async fn run_account_stream(
    mut subscription: Subscription<KeyedAccount>,
    tx: mpsc::Sender<IngestItem>,
    mut shutdown_rx: broadcast::Receiver<ShutdownReason>,
    metrics: Arc<SyncMetrics>,
) {
    loop {
        let account = tokio::select! {
            biased;
            reason = shutdown_rx.recv() => {
                info!(reason = ?reason.ok(), "account stream shutting down");
                break;
            }
            account = subscription.recv() => account,
        };
        let Some(account) = account else {
            warn!("account stream ended");
            break;
        };
        if !push(&tx, IngestItem::Account(account), &metrics).await {
            break;
        }
    }
    close(subscription, "accounts").await;
}

/// Resolve metadata for each log batch that carries vote events and forward
/// the events until shutdown or until the stream ends.
pub(crate) async fn run_log_stream<L: LedgerClient>(
    mut subscription: Subscription<LogBatch>,
    program_id: Address,
    resolver: MetadataResolver<L>,
    tx: mpsc::Sender<IngestItem>,
    mut shutdown_rx: broadcast::Receiver<ShutdownReason>,
    metrics: Arc<SyncMetrics>,
) {
    loop {
        let batch = tokio::select! {
            biased;
            reason = shutdown_rx.recv() => {
                info!(reason = ?reason.ok(), "log stream shutting down");
                break;
            }
            batch = subscription.recv() => batch,
        };
        let Some(batch) = batch else {
            warn!("log stream ended");
            break;
        };
        if batch.failed {
            debug!(signature = %batch.signature, "skipping failed transaction");
            continue;
        }
        let events: Vec<VoteEvent> = vote_events(&program_id, &batch.logs).collect();
        if events.is_empty() {
            continue;
        }
        let meta = resolver
            .resolve(&batch.signature)
            .instrument(log_batch_span(&batch.signature))
            .await;
        for event in events {
            let item = IngestItem::Vote {
                event,
                meta,
                signature: batch.signature.clone(),
            };
            if !push(&tx, item, &metrics).await {
                close(subscription, "logs").await;
                return;
            }
        }
    }
    close(subscription, "logs").await;
}

/// Apply items until every sender is gone.
pub(crate) async fn run_worker(
    mut rx: mpsc::Receiver<IngestItem>,
    reconciler: Reconciler,
    linker: ReverseLinker,
    metrics: Arc<SyncMetrics>,
) {
    while let Some(item) = rx.recv().await {
        apply_item(&reconciler, &linker, item);
        metrics.ingest_queue_depth.set(rx.len() as i64);
    }
    debug!("reconciliation worker stopped");
}

/// Link candidates that were waiting for the poll at `address`.
fn link_for_poll(
    reconciler: &Reconciler,
    linker: &ReverseLinker,
    address: &Address,
) -> Result<u64, SyncError> {
    let Some(poll_id) = reconciler
        .stores()
        .polls
        .find_poll(address)?
        .and_then(|poll| poll.poll_id)
    else {
        return Ok(0);
    };
    linker.link_unlinked_for(poll_id, address)
}

/// Apply one item. Failures are logged and the item is dropped.
pub(crate) fn apply_item(reconciler: &Reconciler, linker: &ReverseLinker, item: IngestItem) {
    match item {
        IngestItem::Account(account) => {
            let _span = account_span(&account.address).entered();
            match reconciler.apply_account(&account) {
                Ok(Some(AccountKind::Candidate)) => {
                    if let Err(e) = linker.link_candidate(&account.address) {
                        warn!(address = %account.address, error = %e, "reverse-link repair failed");
                    }
                }
                Ok(Some(AccountKind::Poll)) => {
                    if let Err(e) = link_for_poll(reconciler, linker, &account.address) {
                        warn!(address = %account.address, error = %e, "reverse-link repair failed");
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(address = %account.address, error = %e, "skipping account"),
            }
        }
        IngestItem::Vote {
            event,
            meta,
            signature,
        } => {
            let _span = vote_span(&event.poll_id, &event.candidate).entered();
            match reconciler.apply_vote(&event, meta, &signature) {
                Ok(outcome) => debug!(
                    signature = %signature,
                    candidate = %outcome.candidate,
                    vote_id = outcome.vote.id,
                    "vote applied"
                ),
                Err(e) => warn!(signature = %signature, error = %e, "skipping vote event"),
            }
        }
    }
}
