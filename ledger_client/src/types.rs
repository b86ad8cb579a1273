//! Values returned by the ledger.

use votesync_types::Address;

/// An account and its raw data buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyedAccount {
    pub address: Address,
    pub data: Vec<u8>,
    /// Slot the observation was made at, 0 if the ledger did not say.
    pub slot: u64,
}

/// The log lines of one transaction, as delivered by the log stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogBatch {
    pub signature: String,
    pub logs: Vec<String>,
    /// True if the transaction failed on chain.
    pub failed: bool,
    pub slot: u64,
}

/// Slot and block time of a confirmed transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionInfo {
    pub slot: u64,
    pub block_time: Option<i64>,
}
