//! Process-wide cancellation signal
//!
//! One [`Shutdown`] is created at startup; every long-running task holds a
//! [`ShutdownListener`] and selects on [`ShutdownListener::wait`] at its
//! suspension points.

use std::sync::Arc;
use tokio::sync::watch;

/// Trigger side of the cancellation signal
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    /// Create an untriggered signal
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the signal; idempotent
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the signal has been raised
    #[inline]
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Create a listener
    #[must_use]
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observer side of the cancellation signal
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Whether the signal has been raised
    #[inline]
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal is raised
    ///
    /// If every [`Shutdown`] handle is dropped without triggering, this
    /// never resolves.
    pub async fn wait(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn listener_sees_trigger() {
        let shutdown = Shutdown::new();
        let mut listener = shutdown.listener();
        assert!(!listener.is_shutdown());

        let handle = tokio::spawn(async move {
            listener.wait().await;
        });
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn late_listener_resolves_immediately() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let mut listener = shutdown.listener();
        listener.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_trigger_never_resolves() {
        let shutdown = Shutdown::new();
        let mut listener = shutdown.listener();
        drop(shutdown);
        let waited = tokio::time::timeout(Duration::from_secs(60), listener.wait()).await;
        assert!(waited.is_err());
    }
}
