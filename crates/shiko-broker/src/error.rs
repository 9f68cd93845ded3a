//! Error types for Shiko Broker

use std::time::Duration;

/// Main broker error type
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Could not reach the broker
    #[error("failed to connect to broker: {0}")]
    Connect(String),

    /// Declaring the exchange, queue or binding failed
    #[error("failed to declare {what}: {source}")]
    Topology {
        /// What was being declared
        what: String,
        /// Underlying failure
        #[source]
        source: lapin::Error,
    },

    /// Protocol or transport failure on an open channel
    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),

    /// The broker refused the message
    #[error("broker rejected {tag} message")]
    Nacked {
        /// Tag of the rejected message
        tag: String,
    },

    /// The broker did not confirm the message
    #[error("no confirmation for {tag} message")]
    Unconfirmed {
        /// Tag of the message
        tag: String,
    },

    /// The event has no wire form
    #[error("{tag} events cannot be published")]
    Unpublishable {
        /// Tag of the event
        tag: String,
    },

    /// Serialization failed
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    /// The connection was lost and the next reconnect is not due yet
    #[error("broker connection lost, reconnecting in {retry_in:?}")]
    Reconnecting {
        /// Time left before the next attempt
        retry_in: Duration,
    },

    /// The publisher was already closed
    #[error("publisher closed")]
    Closed,
}

impl BrokerError {
    /// Check if the event may have been delivered anyway
    #[inline]
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Amqp(_) | Self::Unconfirmed { .. })
    }

    /// Check if the channel behind the failure is gone
    #[inline]
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Amqp(_))
    }

    /// Check if the failure is a startup configuration problem
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Topology { .. })
    }
}
