//! Shutdown coordination for the proxy.

use std::time::Duration;

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel for one stage of shutdown. The proxy runs
/// two: one for the HTTP server and one for the backend flushers, so the
/// flushers outlive every in-flight request.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Sender handed to components that subscribe on their own.
    pub fn sender(&self) -> &broadcast::Sender<()> {
        &self.tx
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Trigger, then wait up to `grace` for every subscriber to drop its
    /// receiver. Returns how many were still running at the deadline.
    pub async fn drain(&self, grace: Duration) -> usize {
        self.trigger();
        let deadline = tokio::time::Instant::now() + grace;
        while self.receiver_count() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
