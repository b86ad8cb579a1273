//! WebSocket pub-sub streams.
//!
//! Each subscription runs on its own task and its own connection. A dropped
//! connection is re-established after `reconnect_delay` and the subscription
//! is re-issued, until the handle is cancelled or dropped.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::{LedgerError, RpcConfig, Subscription};

const SUBSCRIBE_REQUEST_ID: u64 = 1;
const UNSUBSCRIBE_REQUEST_ID: u64 = 2;

/// The three method names and the params of one pub-sub stream.
#[derive(Clone, Debug)]
pub struct PubsubRequest {
    pub subscribe: &'static str,
    pub unsubscribe: &'static str,
    pub notification: &'static str,
    pub params: Value,
}

/// Why one connection ended.
enum ConnectionEnd {
    Cancelled,
    ReceiverGone,
    Dropped(LedgerError),
}

/// Spawn the task backing a subscription and return its handle.
pub fn spawn_subscription<T, F>(config: &RpcConfig, request: PubsubRequest, parse: F) -> Subscription<T>
where
    T: Send + 'static,
    F: Fn(&Value) -> Result<T, LedgerError> + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let url = config.ws_url.clone();
    let delay = config.reconnect_delay;
    let task = tokio::spawn(run(url, request, parse, tx, cancel_rx, delay));
    Subscription::new(rx, cancel_tx, task)
}

async fn run<T, F>(
    url: String,
    request: PubsubRequest,
    parse: F,
    tx: mpsc::Sender<T>,
    mut cancel_rx: oneshot::Receiver<()>,
    reconnect_delay: Duration,
) where
    T: Send + 'static,
    F: Fn(&Value) -> Result<T, LedgerError> + Send + Sync + 'static,
{
    loop {
        match connection(&url, &request, &parse, &tx, &mut cancel_rx).await {
            ConnectionEnd::Cancelled => {
                debug!(method = request.subscribe, "subscription cancelled");
                return;
            }
            ConnectionEnd::ReceiverGone => return,
            ConnectionEnd::Dropped(e) => {
                warn!(method = request.subscribe, error = %e, ?reconnect_delay, "subscription dropped, reconnecting");
                tokio::select! {
                    _ = tokio::time::sleep(reconnect_delay) => {}
                    _ = &mut cancel_rx => return,
                }
            }
        }
    }
}

fn rpc_message(id: u64, method: &str, params: Value) -> Message {
    Message::Text(
        json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }).to_string(),
    )
}

async fn connection<T, F>(
    url: &str,
    request: &PubsubRequest,
    parse: &F,
    tx: &mpsc::Sender<T>,
    cancel_rx: &mut oneshot::Receiver<()>,
) -> ConnectionEnd
where
    F: Fn(&Value) -> Result<T, LedgerError>,
{
    let ws = tokio::select! {
        connected = connect_async(url) => match connected {
            Ok((ws, _)) => ws,
            Err(e) => return ConnectionEnd::Dropped(e.into()),
        },
        _ = &mut *cancel_rx => return ConnectionEnd::Cancelled,
    };
    let (mut sink, mut stream) = ws.split();

    let subscribe = rpc_message(SUBSCRIBE_REQUEST_ID, request.subscribe, request.params.clone());
    if let Err(e) = sink.send(subscribe).await {
        return ConnectionEnd::Dropped(e.into());
    }

    let mut subscription_id: Option<u64> = None;
    loop {
        let message = tokio::select! {
            message = stream.next() => message,
            _ = &mut *cancel_rx => {
                if let Some(id) = subscription_id {
                    let unsubscribe = rpc_message(UNSUBSCRIBE_REQUEST_ID, request.unsubscribe, json!([id]));
                    if let Err(e) = sink.send(unsubscribe).await {
                        debug!(error = %e, "unsubscribe failed");
                    }
                }
                let _ = sink.close().await;
                return ConnectionEnd::Cancelled;
            }
        };

        let text = match message {
            None => return ConnectionEnd::Dropped(LedgerError::Closed),
            Some(Err(e)) => return ConnectionEnd::Dropped(e.into()),
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Ping(payload))) => {
                if let Err(e) = sink.send(Message::Pong(payload)).await {
                    return ConnectionEnd::Dropped(e.into());
                }
                continue;
            }
            Some(Ok(Message::Close(_))) => return ConnectionEnd::Dropped(LedgerError::Closed),
            Some(Ok(_)) => continue,
        };

        let value: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "ignoring non-JSON pub-sub frame");
                continue;
            }
        };

        match classify_frame(&value, request.notification) {
            Frame::Confirmed(id) => {
                info!(method = request.subscribe, subscription = id, "subscribed");
                subscription_id = Some(id);
            }
            Frame::Rejected(e) => return ConnectionEnd::Dropped(e),
            Frame::Notification(result) => match parse(result) {
                Ok(item) => {
                    if tx.send(item).await.is_err() {
                        return ConnectionEnd::ReceiverGone;
                    }
                }
                Err(e) => debug!(error = %e, "skipping malformed notification"),
            },
            Frame::Other => {}
        }
    }
}

enum Frame<'a> {
    Confirmed(u64),
    Rejected(LedgerError),
    Notification(&'a Value),
    Other,
}

fn classify_frame<'a>(value: &'a Value, notification: &str) -> Frame<'a> {
    if value.get("method").and_then(Value::as_str) == Some(notification) {
        return match value.pointer("/params/result") {
            Some(result) => Frame::Notification(result),
            None => Frame::Other,
        };
    }
    if value.get("id").and_then(Value::as_u64) != Some(SUBSCRIBE_REQUEST_ID) {
        return Frame::Other;
    }
    if let Some(err) = value.get("error") {
        return Frame::Rejected(LedgerError::Rpc {
            code: err.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }
    match value.get("result").and_then(Value::as_u64) {
        Some(id) => Frame::Confirmed(id),
        None => Frame::Other,
    }
}
