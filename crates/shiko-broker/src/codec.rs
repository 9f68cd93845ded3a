//! Wire codec
//!
//! Bodies are JSON; the variant travels out of band as the message type
//! property. Decoding looks the tag up in a fixed table and never fails:
//! unknown tags and bad bodies become [`ErrorEvent`]s.

use crate::error::BrokerError;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use shiko_core::{
    tags, AdministrationEvent, ErrorEvent, Event, IncrementEvent, ReplyEvent, UpdateEvent,
};
use std::collections::HashMap;

/// Content type of every body
pub const CONTENT_TYPE: &str = "application/json";

/// Header a deduplicating broker keys on
pub const DEDUPLICATION_HEADER: &str = "x-deduplication-header";

/// An event ready for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// Message type property
    pub tag: &'static str,
    /// JSON body
    pub body: Vec<u8>,
    /// Value of [`DEDUPLICATION_HEADER`]
    pub dedup_key: String,
}

/// Serialize an event
///
/// # Errors
///
/// [`BrokerError::Unpublishable`] for [`Event::Error`];
/// [`BrokerError::Encode`] if serialization fails.
pub fn encode(event: &Event) -> Result<Encoded, BrokerError> {
    let body = match event {
        Event::Reply(e) => serde_json::to_vec(e)?,
        Event::Update(e) => serde_json::to_vec(e)?,
        Event::Increment(e) => serde_json::to_vec(e)?,
        Event::Administration(e) => serde_json::to_vec(e)?,
        Event::Error(_) => {
            return Err(BrokerError::Unpublishable {
                tag: event.tag().to_string(),
            })
        }
    };
    let tag = event.tag();
    let dedup_key = format!("{tag}-{}", hex::encode(Sha256::digest(&body)));
    Ok(Encoded {
        tag,
        body,
        dedup_key,
    })
}

type Decoder = fn(&[u8]) -> Result<Event, serde_json::Error>;

fn decode_as<T>(body: &[u8]) -> Result<Event, serde_json::Error>
where
    T: DeserializeOwned + Into<Event>,
{
    serde_json::from_slice::<T>(body).map(Into::into)
}

static DECODERS: Lazy<HashMap<&'static str, Decoder>> = Lazy::new(|| {
    HashMap::from([
        (tags::REPLY, decode_as::<ReplyEvent> as Decoder),
        (tags::UPDATE, decode_as::<UpdateEvent> as Decoder),
        (tags::INCREMENT, decode_as::<IncrementEvent> as Decoder),
        (tags::ADMINISTRATION, decode_as::<AdministrationEvent> as Decoder),
    ])
});

/// Whether the consumer has a decoder for `tag`
#[must_use]
pub fn is_known_tag(tag: &str) -> bool {
    DECODERS.contains_key(tag)
}

/// Turn a received message back into an event
#[must_use]
pub fn decode(tag: Option<&str>, body: &[u8]) -> Event {
    let error = |reason: String| {
        Event::Error(ErrorEvent {
            tag: tag.map(str::to_string),
            payload: body.to_vec(),
            reason,
        })
    };

    let Some(tag) = tag else {
        return error("message has no type".to_string());
    };
    match DECODERS.get(tag) {
        Some(decoder) => decoder(body).unwrap_or_else(|e| error(format!("invalid {tag} body: {e}"))),
        None => error(format!("unknown message type {tag}")),
    }
}
