//! Decoding of RPC JSON shapes into ledger types.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use votesync_types::Address;

use crate::{KeyedAccount, LedgerError, LogBatch};

#[derive(Deserialize)]
struct RawAccount {
    /// `[payload, encoding]`
    data: (String, String),
}

#[derive(Deserialize)]
struct RawKeyedAccount {
    pubkey: String,
    account: RawAccount,
}

#[derive(Deserialize)]
struct RawContext {
    slot: u64,
}

#[derive(Deserialize)]
struct Contextual<T> {
    context: RawContext,
    value: T,
}

#[derive(Deserialize)]
struct RawLogs {
    signature: String,
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    logs: Vec<String>,
}

fn keyed_account(raw: RawKeyedAccount, slot: u64) -> Result<KeyedAccount, LedgerError> {
    let address: Address = raw
        .pubkey
        .parse()
        .map_err(|e| LedgerError::InvalidResponse(format!("account pubkey: {e}")))?;
    let (payload, encoding) = raw.account.data;
    if encoding != "base64" {
        return Err(LedgerError::InvalidResponse(format!(
            "unexpected account encoding {encoding}"
        )));
    }
    let data = BASE64
        .decode(payload)
        .map_err(|e| LedgerError::InvalidResponse(format!("account data: {e}")))?;
    Ok(KeyedAccount {
        address,
        data,
        slot,
    })
}

/// `getProgramAccounts` result: a bare array of keyed accounts.
///
/// A malformed entry is logged and dropped; only a malformed array fails.
pub(crate) fn program_accounts(result: Value) -> Result<Vec<KeyedAccount>, LedgerError> {
    let raw: Vec<RawKeyedAccount> = serde_json::from_value(result)?;
    Ok(raw
        .into_iter()
        .filter_map(|a| {
            let pubkey = a.pubkey.clone();
            keyed_account(a, 0)
                .inspect_err(|e| warn!(address = %pubkey, error = %e, "skipping malformed account"))
                .ok()
        })
        .collect())
}

/// `programNotification` params.result.
pub(crate) fn program_notification(result: &Value) -> Result<KeyedAccount, LedgerError> {
    let raw: Contextual<RawKeyedAccount> = Deserialize::deserialize(result)?;
    keyed_account(raw.value, raw.context.slot)
}

/// `logsNotification` params.result.
pub(crate) fn logs_notification(result: &Value) -> Result<LogBatch, LedgerError> {
    let raw: Contextual<RawLogs> = Deserialize::deserialize(result)?;
    Ok(LogBatch {
        signature: raw.value.signature,
        logs: raw.value.logs,
        failed: raw.value.err.is_some_and(|e| !e.is_null()),
        slot: raw.context.slot,
    })
}
