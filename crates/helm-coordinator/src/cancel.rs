//! Cooperative cancellation.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative cancellation token.
#[async_trait]
pub trait CancellationToken: Send + Sync {
    /// Resolves when cancellation is requested.
    async fn cancelled(&self);

    /// Non-blocking cancellation check.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Cancellation token that never triggers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

#[async_trait]
impl CancellationToken for NeverCancel {
    async fn cancelled(&self) {
        futures::future::pending::<()>().await;
    }
}

/// Owner side of a cancellable scope.
///
/// Tokens handed out by [`CancellationSource::token`] observe [`cancel`]
/// calls; once cancelled they stay cancelled.
///
/// [`cancel`]: CancellationSource::cancel
#[derive(Debug)]
pub struct CancellationSource {
    cancel_tx: watch::Sender<bool>,
}

impl CancellationSource {
    /// Fresh, uncancelled source
    pub fn new() -> Self {
        let (cancel_tx, _cancel_rx) = watch::channel(false);
        Self { cancel_tx }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Token observing this source
    pub fn token(&self) -> Arc<dyn CancellationToken> {
        Arc::new(WatchCancellationToken {
            cancel_rx: self.cancel_tx.subscribe(),
        })
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct WatchCancellationToken {
    cancel_rx: watch::Receiver<bool>,
}

#[async_trait]
impl CancellationToken for WatchCancellationToken {
    async fn cancelled(&self) {
        let mut cancel_rx = self.cancel_rx.clone();
        loop {
            if *cancel_rx.borrow() {
                return;
            }
            // source dropped without cancelling
            if cancel_rx.changed().await.is_err() {
                futures::future::pending::<()>().await;
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }
}
