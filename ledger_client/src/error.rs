use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("subscription closed")]
    Closed,
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LedgerError::Http(format!("request timed out: {e}"))
        } else if e.is_connect() {
            LedgerError::Http(format!("connection failed: {e}"))
        } else {
            LedgerError::Http(e.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for LedgerError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        LedgerError::WebSocket(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::InvalidResponse(e.to_string())
    }
}
