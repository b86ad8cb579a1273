//! HTTP server for the read API.

use std::future::Future;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};
use votesync_indexer::{Stores, SyncMetrics};
use votesync_types::Clock;

use crate::{handlers, ApiError};

/// Shared state handed to every handler.
pub struct ApiState {
    pub stores: Stores,
    pub metrics: Arc<SyncMetrics>,
    pub clock: Arc<dyn Clock>,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET])
        .allow_headers(Any)
}

/// Build the router with every read endpoint.
pub fn router(state: Arc<ApiState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/polls", get(handlers::list_polls))
        .route("/polls/:poll_id", get(handlers::get_poll))
        .route("/polls/:poll_id/leaderboard", get(handlers::leaderboard))
        .route("/polls/:poll_id/votes", get(handlers::poll_votes))
        .route("/polls/:poll_id/vote-stats", get(handlers::vote_stats))
        .route("/polls/:poll_id/voters/:voter", get(handlers::voter_votes))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

pub struct ApiServer {
    pub port: u16,
    pub state: Arc<ApiState>,
    pub cors_origins: Vec<String>,
}

impl ApiServer {
    pub fn new(port: u16, state: Arc<ApiState>, cors_origins: Vec<String>) -> Self {
        Self {
            port,
            state,
            cors_origins,
        }
    }

    /// Serve until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), ApiError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(self.state.clone(), &self.cors_origins);
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ApiError::Server(format!("bind {addr}: {e}")))?;
        info!("read API listening on {}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ApiError::Server(e.to_string()))
    }
}
