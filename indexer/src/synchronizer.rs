//! The synchronizer owns both live subscriptions and the tasks around them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use votesync_crypto::AddressDeriver;
use votesync_ledger_client::LedgerClient;
use votesync_types::Address;

use crate::live::{run_account_stream, run_log_stream, run_worker, UNSUBSCRIBE_TIMEOUT};
use crate::{
    run_backfill, BackfillReport, MetadataResolver, Reconciler, ReverseLinker, ShutdownController,
    Stores, SyncError, SyncMetrics,
};

/// Timeout for waiting on the stream tasks and the worker during shutdown.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Mirrors one program's polls, candidates and votes into the store.
///
/// [`start`](Self::start) runs the backfill to completion and only then
/// attaches the account and log subscriptions. [`stop`](Self::stop)
/// unsubscribes both and waits for the worker to drain.
pub struct Synchronizer<L: LedgerClient> {
    ledger: Arc<L>,
    stores: Stores,
    deriver: AddressDeriver,
    metrics: Arc<SyncMetrics>,
    ingest_capacity: usize,
    shutdown: ShutdownController,
    task_handles: Vec<JoinHandle<()>>,
}

impl<L: LedgerClient> Synchronizer<L> {
    pub fn new(
        ledger: Arc<L>,
        stores: Stores,
        program_id: Address,
        ingest_capacity: usize,
        metrics: Arc<SyncMetrics>,
    ) -> Self {
        Self {
            ledger,
            stores,
            deriver: AddressDeriver::new(program_id),
            metrics,
            ingest_capacity: ingest_capacity.max(1),
            shutdown: ShutdownController::new(),
            task_handles: Vec::new(),
        }
    }

    pub fn program_id(&self) -> &Address {
        self.deriver.program_id()
    }

    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.metrics
    }

    pub fn is_running(&self) -> bool {
        !self.task_handles.is_empty()
    }

    fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.stores.clone(), self.deriver, self.metrics.clone())
    }

    fn linker(&self) -> ReverseLinker {
        ReverseLinker::new(&self.stores, self.deriver, self.metrics.clone())
    }

    /// Backfill, then subscribe and spawn the stream tasks and the worker.
    pub async fn start(&mut self) -> Result<BackfillReport, SyncError> {
        if self.is_running() {
            return Err(SyncError::AlreadyRunning);
        }
        let program_id = *self.deriver.program_id();

        let report = run_backfill(
            self.ledger.as_ref(),
            &program_id,
            &self.reconciler(),
            &self.linker(),
        )
        .await?;

        let accounts = self
            .ledger
            .subscribe_account_changes(&program_id)
            .await
            .map_err(|e| SyncError::Subscription(format!("account changes: {e}")))?;
        let logs = match self.ledger.subscribe_transaction_logs(&program_id).await {
            Ok(logs) => logs,
            Err(e) => {
                let _ = accounts.unsubscribe(UNSUBSCRIBE_TIMEOUT).await;
                return Err(SyncError::Subscription(format!("transaction logs: {e}")));
            }
        };

        self.shutdown = ShutdownController::new();
        let (tx, rx) = mpsc::channel(self.ingest_capacity);

        self.task_handles.push(tokio::spawn(run_worker(
            rx,
            self.reconciler(),
            self.linker(),
            self.metrics.clone(),
        )));
        self.task_handles.push(tokio::spawn(run_account_stream(
            accounts,
            tx.clone(),
            self.shutdown.subscribe(),
            self.metrics.clone(),
        )));
        self.task_handles.push(tokio::spawn(run_log_stream(
            logs,
            program_id,
            MetadataResolver::new(self.ledger.clone()),
            tx,
            self.shutdown.subscribe(),
            self.metrics.clone(),
        )));

        info!(program = %program_id, "live synchronization started");
        Ok(report)
    }

    /// Unsubscribe both streams and wait for the worker to drain.
    pub async fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        self.shutdown.shutdown();

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all).await.is_err() {
            warn!(
                "shutdown timeout ({:?}), some tasks may still be running",
                SHUTDOWN_TIMEOUT
            );
        }
        info!("synchronizer stopped");
    }
}
