//! Confirming publisher
//!
//! A publish only succeeds once the broker acknowledges the message. A
//! negative acknowledgement or a transport failure means the event should
//! be treated as undelivered.
//!
//! A transport failure marks the channel as lost. The next publish reopens
//! it first; when that fails, publishes are refused until the backoff delay
//! has passed.

use crate::codec::{self, Encoded};
use crate::error::BrokerError;
use async_trait::async_trait;
use parking_lot::Mutex;
use shiko_core::{Backoff, Event, EventPublisher};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::Instant;

/// Broker verdict for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Accepted
    Ack,
    /// Refused
    Nack,
    /// Channel is not in confirm mode
    NotRequested,
}

/// Channel in publisher-confirm mode
#[async_trait]
pub trait ConfirmChannel: Send + Sync {
    /// Send one message and wait for its confirmation
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: &Encoded,
    ) -> Result<Confirmation, BrokerError>;

    /// Wait until every outstanding confirmation has arrived
    async fn wait_for_confirms(&self) -> Result<(), BrokerError>;

    /// Close the channel and its connection
    async fn close(&self) -> Result<(), BrokerError>;

    /// Drop the current connection and open a fresh confirm-mode channel
    async fn reconnect(&self) -> Result<(), BrokerError>;
}

#[derive(Debug, Default)]
struct Link {
    lost: bool,
    backoff: Backoff,
    retry_at: Option<Instant>,
}

/// Publishes events to a topic exchange under a fixed routing key
pub struct Publisher<C> {
    channel: C,
    exchange: String,
    routing_key: String,
    closed: AtomicBool,
    link: Mutex<Link>,
}

impl<C: ConfirmChannel> Publisher<C> {
    /// Create a publisher over a confirm-mode channel
    pub fn new(channel: C, exchange: impl Into<String>, routing_key: impl Into<String>) -> Self {
        Self {
            channel,
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            closed: AtomicBool::new(false),
            link: Mutex::new(Link::default()),
        }
    }

    /// Use a custom reconnect backoff
    #[must_use]
    pub fn with_backoff(self, backoff: Backoff) -> Self {
        self.link.lock().backoff = backoff;
        self
    }

    /// Whether the channel is known to be lost
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        self.link.lock().lost
    }

    async fn restore(&self) -> Result<(), BrokerError> {
        {
            let link = self.link.lock();
            if !link.lost {
                return Ok(());
            }
            if let Some(at) = link.retry_at {
                let now = Instant::now();
                if now < at {
                    return Err(BrokerError::Reconnecting { retry_in: at - now });
                }
            }
        }

        let reconnected = self.channel.reconnect().await;
        let mut link = self.link.lock();
        match reconnected {
            Ok(()) => {
                link.lost = false;
                link.retry_at = None;
                link.backoff.reset();
                tracing::info!(exchange = %self.exchange, "broker channel restored");
                Ok(())
            }
            Err(e) => {
                let after = link.backoff.next_delay();
                link.retry_at = Some(Instant::now() + after);
                tracing::warn!(error = %e, after = ?after, "broker reconnect failed");
                Err(e)
            }
        }
    }

    /// Target exchange
    #[inline]
    #[must_use]
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Routing key of every message
    #[inline]
    #[must_use]
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Underlying channel
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &C {
        &self.channel
    }
}

#[async_trait]
impl<C: ConfirmChannel> EventPublisher for Publisher<C> {
    type Error = BrokerError;

    async fn publish(&self, event: &Event) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrokerError::Closed);
        }
        let encoded = codec::encode(event)?;
        self.restore().await?;

        let confirmation = match self
            .channel
            .publish(&self.exchange, &self.routing_key, &encoded)
            .await
        {
            Ok(confirmation) => confirmation,
            Err(e) => {
                if e.is_connection_lost() {
                    tracing::warn!(error = %e, "broker connection lost");
                    self.link.lock().lost = true;
                }
                return Err(e);
            }
        };

        match confirmation {
            Confirmation::Ack => {
                tracing::debug!(tag = encoded.tag, bytes = encoded.body.len(), "event published");
                Ok(())
            }
            Confirmation::Nack => Err(BrokerError::Nacked {
                tag: encoded.tag.to_string(),
            }),
            Confirmation::NotRequested => Err(BrokerError::Unconfirmed {
                tag: encoded.tag.to_string(),
            }),
        }
    }

    async fn close(&self) -> Result<(), BrokerError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let drained = self.channel.wait_for_confirms().await;
        let closed = self.channel.close().await;
        drained.and(closed)
    }
}
