use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("config error: {0}")]
    Config(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] votesync_ledger_client::LedgerError),

    #[error("store error: {0}")]
    Store(#[from] votesync_store::StoreError),

    #[error("address derivation failed: {0}")]
    Derive(#[from] votesync_crypto::DeriveError),

    #[error("decode error: {0}")]
    Decode(#[from] votesync_codec::DecodeError),

    #[error("subscription error: {0}")]
    Subscription(String),

    #[error("synchronizer is already running")]
    AlreadyRunning,
}
