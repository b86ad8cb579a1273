//! The ledger collaborator interface.

use std::future::Future;

use votesync_types::Address;

use crate::{KeyedAccount, LedgerError, LogBatch, Subscription, TransactionInfo};

/// Everything the synchronizer needs from the ledger.
pub trait LedgerClient: Send + Sync + 'static {
    /// All accounts owned by `program_id` whose data starts with `tag`.
    fn list_accounts_by_tag(
        &self,
        program_id: &Address,
        tag: &[u8],
    ) -> impl Future<Output = Result<Vec<KeyedAccount>, LedgerError>> + Send;

    fn subscribe_account_changes(
        &self,
        program_id: &Address,
    ) -> impl Future<Output = Result<Subscription<KeyedAccount>, LedgerError>> + Send;

    /// Log batches of transactions that mention `program_id`.
    fn subscribe_transaction_logs(
        &self,
        program_id: &Address,
    ) -> impl Future<Output = Result<Subscription<LogBatch>, LedgerError>> + Send;

    /// `None` if the ledger does not know the transaction.
    fn get_transaction(
        &self,
        signature: &str,
    ) -> impl Future<Output = Result<Option<TransactionInfo>, LedgerError>> + Send;

    /// Slot the signature was processed in, if the ledger has a status for it.
    fn get_signature_status(
        &self,
        signature: &str,
    ) -> impl Future<Output = Result<Option<u64>, LedgerError>> + Send;

    fn get_block_time(
        &self,
        slot: u64,
    ) -> impl Future<Output = Result<Option<i64>, LedgerError>> + Send;

    /// Version string of the remote node.
    fn get_version(&self) -> impl Future<Output = Result<String, LedgerError>> + Send;
}
