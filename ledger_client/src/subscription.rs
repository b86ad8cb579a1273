//! Owned handle to a live stream.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::LedgerError;

/// A live stream of `T` backed by a background task.
///
/// Items are read with [`Subscription::recv`]. [`Subscription::unsubscribe`]
/// asks the task to unsubscribe remotely and waits for it to end. Dropping
/// the handle also cancels the task, without waiting.
pub struct Subscription<T> {
    rx: mpsc::Receiver<T>,
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl<T> Subscription<T> {
    pub fn new(rx: mpsc::Receiver<T>, cancel: oneshot::Sender<()>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            cancel: Some(cancel),
            task: Some(task),
        }
    }

    /// `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Cancel the stream and wait up to `timeout` for its task to finish.
    pub async fn unsubscribe(mut self, timeout: Duration) -> Result<(), LedgerError> {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.rx.close();
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(LedgerError::WebSocket(format!("subscription task failed: {e}"))),
            Err(_) => {
                debug!(?timeout, "subscription task did not stop in time");
                Err(LedgerError::WebSocket("unsubscribe timed out".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsubscribe_signals_task() {
        let (tx, rx) = mpsc::channel(4);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            tx.send(1u32).await.unwrap();
            let _ = cancel_rx.await;
        });
        let mut sub = Subscription::new(rx, cancel_tx, task);
        assert_eq!(sub.recv().await, Some(1));
        sub.unsubscribe(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn unsubscribe_times_out_on_stuck_task() {
        let (_tx, rx) = mpsc::channel::<u32>(1);
        let (cancel_tx, _cancel_rx) = oneshot::channel();
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        let sub = Subscription::new(rx, cancel_tx, task);
        assert!(sub.unsubscribe(Duration::from_millis(20)).await.is_err());
    }
}
