//! Shiko Broker - bridge between producer and reactor
//!
//! - Publisher: JSON body, type-tagged, confirmed by the broker
//! - Subscriber: tag → decoder table, unknown tags become error events
//! - AMQP transport and topology on lapin
//!
//! Both sides sit behind small traits ([`ConfirmChannel`],
//! [`MessageSource`]) so the pipeline can run against in-memory doubles.

#![warn(unreachable_pub)]

pub mod amqp;
pub mod codec;
pub mod error;
pub mod publisher;
pub mod subscriber;

// Re-exports for convenience
pub use amqp::{
    AmqpConfirmChannel, AmqpMessageSource, BrokerConfig, DEFAULT_EXCHANGE, DEFAULT_QUEUE,
    DEFAULT_ROUTING_KEY,
};
pub use codec::{decode, encode, is_known_tag, Encoded, CONTENT_TYPE, DEDUPLICATION_HEADER};
pub use error::BrokerError;
pub use publisher::{ConfirmChannel, Confirmation, Publisher};
pub use subscriber::{
    IncomingMessage, MessageSource, Subscriber, EVENT_CHANNEL_CAPACITY, MESSAGE_TTL,
};

/// Publisher over a lapin channel
pub type AmqpPublisher = Publisher<AmqpConfirmChannel>;

/// Subscriber over a lapin consumer
pub type AmqpSubscriber = Subscriber<AmqpMessageSource>;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
