//! JSON-RPC over HTTP.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use votesync_types::Address;

use crate::pubsub::{spawn_subscription, PubsubRequest};
use crate::{
    parse, KeyedAccount, LedgerClient, LedgerError, LogBatch, Subscription, TransactionInfo,
    COMMITMENT,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Endpoints and tuning for [`RpcLedgerClient`].
#[derive(Clone, Debug)]
pub struct RpcConfig {
    pub http_url: String,
    pub ws_url: String,
    pub request_timeout: Duration,
    pub reconnect_delay: Duration,
    pub channel_capacity: usize,
}

impl RpcConfig {
    pub fn new(http_url: impl Into<String>, ws_url: impl Into<String>) -> Self {
        Self {
            http_url: http_url.into(),
            ws_url: ws_url.into(),
            request_timeout: DEFAULT_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionResponse {
    slot: u64,
    #[serde(default)]
    block_time: Option<i64>,
}

#[derive(Deserialize)]
struct SignatureStatus {
    slot: u64,
}

#[derive(Deserialize)]
struct SignatureStatuses {
    value: Vec<Option<SignatureStatus>>,
}

#[derive(Deserialize)]
struct VersionResponse {
    #[serde(rename = "solana-core")]
    solana_core: String,
}

/// Solana RPC client: HTTP for requests, WebSocket for subscriptions.
pub struct RpcLedgerClient {
    http_client: reqwest::Client,
    config: RpcConfig,
    next_id: AtomicU64,
}

impl RpcLedgerClient {
    pub fn new(config: RpcConfig) -> Result<Self, LedgerError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            http_client,
            config,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Send one request and return its `result`, which may be `null`.
    async fn call_raw(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "rpc request");

        let response = self
            .http_client
            .post(&self.config.http_url)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(LedgerError::Http(format!(
                "{method}: HTTP status {}",
                response.status()
            )));
        }
        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("{method}: {e}")))?;
        if let Some(err) = parsed.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(parsed.result)
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R, LedgerError> {
        let result = self.call_raw(method, params).await?;
        serde_json::from_value(result)
            .map_err(|e| LedgerError::InvalidResponse(format!("{method}: {e}")))
    }
}

impl LedgerClient for RpcLedgerClient {
    async fn list_accounts_by_tag(
        &self,
        program_id: &Address,
        tag: &[u8],
    ) -> Result<Vec<KeyedAccount>, LedgerError> {
        let params = json!([
            program_id.to_string(),
            {
                "encoding": "base64",
                "commitment": COMMITMENT,
                "filters": [{ "memcmp": { "offset": 0, "bytes": bs58::encode(tag).into_string() } }],
            }
        ]);
        let result = self.call_raw("getProgramAccounts", params).await?;
        parse::program_accounts(result)
    }

    async fn subscribe_account_changes(
        &self,
        program_id: &Address,
    ) -> Result<Subscription<KeyedAccount>, LedgerError> {
        let request = PubsubRequest {
            subscribe: "programSubscribe",
            unsubscribe: "programUnsubscribe",
            notification: "programNotification",
            params: json!([
                program_id.to_string(),
                { "encoding": "base64", "commitment": COMMITMENT }
            ]),
        };
        Ok(spawn_subscription(
            &self.config,
            request,
            parse::program_notification,
        ))
    }

    async fn subscribe_transaction_logs(
        &self,
        program_id: &Address,
    ) -> Result<Subscription<LogBatch>, LedgerError> {
        let request = PubsubRequest {
            subscribe: "logsSubscribe",
            unsubscribe: "logsUnsubscribe",
            notification: "logsNotification",
            params: json!([
                { "mentions": [program_id.to_string()] },
                { "commitment": COMMITMENT }
            ]),
        };
        Ok(spawn_subscription(
            &self.config,
            request,
            parse::logs_notification,
        ))
    }

    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionInfo>, LedgerError> {
        // Without maxSupportedTransactionVersion the node only returns legacy
        // transactions.
        let params = json!([signature, { "encoding": "json", "commitment": COMMITMENT }]);
        let tx: Option<TransactionResponse> = self.call("getTransaction", params).await?;
        Ok(tx.map(|t| TransactionInfo {
            slot: t.slot,
            block_time: t.block_time,
        }))
    }

    async fn get_signature_status(&self, signature: &str) -> Result<Option<u64>, LedgerError> {
        let params = json!([[signature], { "searchTransactionHistory": true }]);
        let statuses: SignatureStatuses = self.call("getSignatureStatuses", params).await?;
        Ok(statuses.value.into_iter().next().flatten().map(|s| s.slot))
    }

    async fn get_block_time(&self, slot: u64) -> Result<Option<i64>, LedgerError> {
        self.call("getBlockTime", json!([slot])).await
    }

    async fn get_version(&self) -> Result<String, LedgerError> {
        let version: VersionResponse = self.call("getVersion", json!([])).await?;
        Ok(version.solana_core)
    }
}
