//! Nullable ledger: scripted RPC answers and hand-fed subscriptions.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};

use votesync_ledger_client::{
    KeyedAccount, LedgerClient, LedgerError, LogBatch, Subscription, TransactionInfo,
};
use votesync_types::Address;

const CHANNEL_CAPACITY: usize = 256;

/// A scripted ledger for testing.
///
/// Accounts, transactions, statuses and block times are registered up front.
/// Subscriptions are fed with [`NullLedger::emit_account`] and
/// [`NullLedger::emit_logs`]. Every call is recorded by method name.
#[derive(Default)]
pub struct NullLedger {
    accounts: Mutex<Vec<KeyedAccount>>,
    transactions: Mutex<HashMap<String, TransactionInfo>>,
    statuses: Mutex<HashMap<String, u64>>,
    block_times: Mutex<HashMap<u64, i64>>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<&'static str>>,
    account_tx: Mutex<Option<mpsc::Sender<KeyedAccount>>>,
    log_tx: Mutex<Option<mpsc::Sender<LogBatch>>>,
    closed: Arc<AtomicUsize>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, address: Address, data: Vec<u8>) {
        self.accounts.lock().unwrap().push(KeyedAccount {
            address,
            data,
            slot: 0,
        });
    }

    pub fn add_transaction(&self, signature: &str, slot: u64, block_time: Option<i64>) {
        self.transactions
            .lock()
            .unwrap()
            .insert(signature.to_string(), TransactionInfo { slot, block_time });
    }

    pub fn add_signature_status(&self, signature: &str, slot: u64) {
        self.statuses
            .lock()
            .unwrap()
            .insert(signature.to_string(), slot);
    }

    pub fn add_block_time(&self, slot: u64, block_time: i64) {
        self.block_times.lock().unwrap().insert(slot, block_time);
    }

    /// Make every call to `method` fail with an RPC error.
    pub fn fail(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    /// Method names in call order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of subscriptions that were unsubscribed or dropped.
    pub fn closed_subscriptions(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Push an account change into the live subscription. Returns `false` if
    /// nothing is subscribed.
    pub async fn emit_account(&self, address: Address, data: Vec<u8>) -> bool {
        let tx = self.account_tx.lock().unwrap().clone();
        match tx {
            Some(tx) => tx
                .send(KeyedAccount {
                    address,
                    data,
                    slot: 0,
                })
                .await
                .is_ok(),
            None => false,
        }
    }

    /// Push a log batch into the live subscription. Returns `false` if
    /// nothing is subscribed.
    pub async fn emit_logs(&self, signature: &str, logs: Vec<String>) -> bool {
        let tx = self.log_tx.lock().unwrap().clone();
        match tx {
            Some(tx) => tx
                .send(LogBatch {
                    signature: signature.to_string(),
                    logs,
                    failed: false,
                    slot: 0,
                })
                .await
                .is_ok(),
            None => false,
        }
    }

    fn record(&self, method: &'static str) -> Result<(), LedgerError> {
        self.calls.lock().unwrap().push(method);
        if self.failing.lock().unwrap().contains(method) {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: format!("{method} scripted failure"),
            });
        }
        Ok(())
    }

    fn subscription<T: Send + 'static>(&self, slot: &Mutex<Option<mpsc::Sender<T>>>) -> Subscription<T> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        *slot.lock().unwrap() = Some(tx);
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let closed = self.closed.clone();
        let task = tokio::spawn(async move {
            let _ = cancel_rx.await;
            closed.fetch_add(1, Ordering::SeqCst);
        });
        Subscription::new(rx, cancel_tx, task)
    }
}

impl LedgerClient for NullLedger {
    async fn list_accounts_by_tag(
        &self,
        _program_id: &Address,
        tag: &[u8],
    ) -> Result<Vec<KeyedAccount>, LedgerError> {
        self.record("getProgramAccounts")?;
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.data.starts_with(tag))
            .cloned()
            .collect())
    }

    async fn subscribe_account_changes(
        &self,
        _program_id: &Address,
    ) -> Result<Subscription<KeyedAccount>, LedgerError> {
        self.record("programSubscribe")?;
        Ok(self.subscription(&self.account_tx))
    }

    async fn subscribe_transaction_logs(
        &self,
        _program_id: &Address,
    ) -> Result<Subscription<LogBatch>, LedgerError> {
        self.record("logsSubscribe")?;
        Ok(self.subscription(&self.log_tx))
    }

    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionInfo>, LedgerError> {
        self.record("getTransaction")?;
        Ok(self.transactions.lock().unwrap().get(signature).copied())
    }

    async fn get_signature_status(&self, signature: &str) -> Result<Option<u64>, LedgerError> {
        self.record("getSignatureStatuses")?;
        Ok(self.statuses.lock().unwrap().get(signature).copied())
    }

    async fn get_block_time(&self, slot: u64) -> Result<Option<i64>, LedgerError> {
        self.record("getBlockTime")?;
        Ok(self.block_times.lock().unwrap().get(&slot).copied())
    }

    async fn get_version(&self) -> Result<String, LedgerError> {
        self.record("getVersion")?;
        Ok("null-ledger".to_string())
    }
}
