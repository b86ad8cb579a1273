//! Shutdown signalling for the synchronizer and the read API.
//!
//! A [`ShutdownController`] broadcasts one [`ShutdownReason`] to the stream
//! tasks and to the HTTP server. The first trigger wins and is latched, so a
//! late subscriber still sees that shutdown has begun.

use std::fmt;
use std::future::Future;
use std::sync::OnceLock;

use tokio::signal;
use tokio::sync::broadcast;

/// Why the mirror is shutting down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    /// `Synchronizer::stop` or another programmatic caller.
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShutdownReason::Interrupt => "SIGINT",
            ShutdownReason::Terminate => "SIGTERM",
            ShutdownReason::Requested => "stop requested",
        })
    }
}

pub struct ShutdownController {
    tx: broadcast::Sender<ShutdownReason>,
    reason: OnceLock<ShutdownReason>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            reason: OnceLock::new(),
        }
    }

    /// Stream tasks `select!` on this receiver next to their subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownReason> {
        self.tx.subscribe()
    }

    /// Broadcast `reason`. Returns `false` if shutdown was already triggered.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        if self.reason.set(reason).is_err() {
            return false;
        }
        let _ = self.tx.send(reason);
        true
    }

    pub fn shutdown(&self) {
        self.trigger(ShutdownReason::Requested);
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    /// A future that resolves once shutdown is triggered, for
    /// `axum::serve(..).with_graceful_shutdown`.
    pub fn signalled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        let already = self.reason.get().is_some();
        async move {
            if !already {
                let _ = rx.recv().await;
            }
        }
    }

    /// Wait for SIGINT or SIGTERM, then broadcast it.
    pub async fn wait_for_signal(&self) -> ShutdownReason {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let reason = tokio::select! {
            _ = ctrl_c => ShutdownReason::Interrupt,
            _ = terminate => ShutdownReason::Terminate,
        };
        tracing::info!(%reason, "shutdown signal received");
        self.trigger(reason);
        reason
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_reason_reaches_every_subscriber() {
        let controller = ShutdownController::new();
        let mut accounts = controller.subscribe();
        let mut logs = controller.subscribe();
        assert!(controller.trigger(ShutdownReason::Terminate));
        assert!(!controller.trigger(ShutdownReason::Requested));
        assert_eq!(accounts.recv().await.unwrap(), ShutdownReason::Terminate);
        assert_eq!(logs.recv().await.unwrap(), ShutdownReason::Terminate);
        assert_eq!(controller.reason(), Some(ShutdownReason::Terminate));
    }

    #[tokio::test]
    async fn signalled_resolves_before_and_after_trigger() {
        let controller = ShutdownController::new();
        let pending = controller.signalled();
        controller.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(1), pending)
            .await
            .unwrap();

        let late = controller.signalled();
        tokio::time::timeout(std::time::Duration::from_secs(1), late)
            .await
            .unwrap();
        assert_eq!(controller.reason(), Some(ShutdownReason::Requested));
    }
}
