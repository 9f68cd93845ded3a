//! Tag-routed subscriber
//!
//! Messages are acknowledged as they are received (at-most-once), decoded
//! by tag, and forwarded as [`Event`]s. Nothing a message contains can stop
//! the loop; only cancellation does. When the source ends, the subscriber
//! reconnects it with backoff. Messages published more than
//! [`MESSAGE_TTL`] ago are dropped unread.

use crate::codec;
use crate::error::BrokerError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shiko_core::{Backoff, Event, ShutdownListener};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default capacity of the event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Age past which a message is discarded
pub const MESSAGE_TTL: Duration = Duration::from_secs(30 * 60);

/// A received, already acknowledged message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Message type property
    pub tag: Option<String>,
    /// Publish timestamp, when the publisher set one
    pub published_at: Option<DateTime<Utc>>,
    /// Raw body
    pub body: Vec<u8>,
}

/// Source of broker messages
#[async_trait]
pub trait MessageSource: Send {
    /// Next message; `None` once the consumer is gone
    async fn next(&mut self) -> Option<Result<IncomingMessage, BrokerError>>;

    /// Stop consuming and release the channel
    async fn cancel(&mut self) -> Result<(), BrokerError>;

    /// Drop the current connection and start consuming again
    async fn reconnect(&mut self) -> Result<(), BrokerError>;
}

/// Decodes broker messages into events
pub struct Subscriber<S> {
    source: S,
    backoff: Backoff,
    ttl: Duration,
}

impl<S: MessageSource + 'static> Subscriber<S> {
    /// Create a subscriber over a message source
    pub fn new(source: S) -> Self {
        Self {
            source,
            backoff: Backoff::default(),
            ttl: MESSAGE_TTL,
        }
    }

    /// Use a custom reconnect backoff
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Use a custom message age limit
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Run on a background task
    pub fn spawn(
        self,
        shutdown: ShutdownListener,
        capacity: usize,
    ) -> (mpsc::Receiver<Event>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(self.run(tx, shutdown));
        (rx, handle)
    }

    /// Forward decoded events until cancelled
    pub async fn run(mut self, tx: mpsc::Sender<Event>, mut shutdown: ShutdownListener) {
        loop {
            let next = tokio::select! {
                biased;
                () = shutdown.wait() => break,
                m = self.source.next() => m,
            };
            let message = match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    tracing::error!(error = %e, "failed to receive message");
                    continue;
                }
                None => {
                    tracing::warn!("message source ended, reconnecting");
                    if self.reconnect(&mut shutdown).await {
                        continue;
                    }
                    break;
                }
            };

            if self.is_stale(&message) {
                tracing::warn!(
                    tag = message.tag.as_deref().unwrap_or(""),
                    published_at = ?message.published_at,
                    "discarding stale message"
                );
                continue;
            }

            let event = codec::decode(message.tag.as_deref(), &message.body);
            if let Event::Error(e) = &event {
                tracing::warn!(
                    tag = e.tag.as_deref().unwrap_or(""),
                    reason = %e.reason,
                    "undecodable message"
                );
            }

            let sent = tokio::select! {
                biased;
                () = shutdown.wait() => false,
                r = tx.send(event) => r.is_ok(),
            };
            if !sent {
                break;
            }
        }

        if let Err(e) = self.source.cancel().await {
            tracing::warn!(error = %e, "failed to cancel consumer");
        }
        tracing::debug!("subscriber stopped");
    }

    /// Reopen the source; `false` means cancelled first.
    async fn reconnect(&mut self, shutdown: &mut ShutdownListener) -> bool {
        loop {
            let reconnected = tokio::select! {
                biased;
                () = shutdown.wait() => return false,
                r = self.source.reconnect() => r,
            };
            match reconnected {
                Ok(()) => {
                    self.backoff.reset();
                    tracing::info!("message source reconnected");
                    return true;
                }
                Err(e) => {
                    let after = self.backoff.next_delay();
                    tracing::error!(error = %e, after = ?after, "failed to reconnect message source");
                    tokio::select! {
                        biased;
                        () = shutdown.wait() => return false,
                        () = tokio::time::sleep(after) => {}
                    }
                }
            }
        }
    }

    fn is_stale(&self, message: &IncomingMessage) -> bool {
        let Some(published_at) = message.published_at else {
            return false;
        };
        (Utc::now() - published_at)
            .to_std()
            .is_ok_and(|age| age > self.ttl)
    }
}
