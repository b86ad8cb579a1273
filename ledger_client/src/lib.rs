//! Ledger access layer.
//!
//! `LedgerClient` is the seam between the synchronizer and the ledger's RPC
//! surface. `RpcLedgerClient` speaks Solana JSON-RPC over HTTP for requests
//! and the WebSocket pub-sub API for the two live streams.

pub mod client;
pub mod error;
mod parse;
pub mod pubsub;
pub mod rpc;
pub mod subscription;
pub mod types;

pub use client::LedgerClient;
pub use error::LedgerError;
pub use rpc::{RpcConfig, RpcLedgerClient};
pub use subscription::Subscription;
pub use types::{KeyedAccount, LogBatch, TransactionInfo};

/// Commitment level used for every request and subscription.
pub const COMMITMENT: &str = "confirmed";
