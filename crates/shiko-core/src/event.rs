//! Commands carried from triggers to executors
//!
//! Every variant except [`Event::Error`] has a stable tag that travels with
//! the message on the broker so the consumer can pick a decoder:
//! - `events.reply` for [`ReplyEvent`]
//! - `events.update` for [`UpdateEvent`]
//! - `events.increment` for [`IncrementEvent`]
//! - `events.administration` for [`AdministrationEvent`]
//!
//! [`ErrorEvent`] only exists on the consuming side.

use crate::types::Visibility;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Stable message tags
pub mod tags {
    /// Tag of [`super::ReplyEvent`]
    pub const REPLY: &str = "events.reply";
    /// Tag of [`super::UpdateEvent`]
    pub const UPDATE: &str = "events.update";
    /// Tag of [`super::IncrementEvent`]
    pub const INCREMENT: &str = "events.increment";
    /// Tag of [`super::AdministrationEvent`]
    pub const ADMINISTRATION: &str = "events.administration";
    /// Tag reported for undecodable messages; never sent
    pub const ERROR: &str = "events.error";

    /// Every tag a consumer knows how to decode
    pub const ALL: [&str; 4] = [REPLY, UPDATE, INCREMENT, ADMINISTRATION];
}

/// Reply to a status with the given body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyEvent {
    /// Status being replied to
    pub in_reply_to: String,
    /// Handle to mention
    pub acct: String,
    /// Reply text, without the mention
    pub body: String,
    /// Visibility of the reply
    pub visibility: Visibility,
}

/// Day rollover for the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEvent {
    /// The day that just started
    pub date: NaiveDate,
}

/// Bump the counter of a user on a day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementEvent {
    /// Account ID
    pub user: String,
    /// Day the bump belongs to
    pub date: NaiveDate,
}

/// Administrative command issued by the bot owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministrationEvent {
    /// Status carrying the command
    pub in_reply_to: String,
    /// Handle to mention in the result
    pub acct: String,
    /// Command family, e.g. `DB`
    #[serde(rename = "type")]
    pub kind: String,
    /// Command text
    pub command: String,
    /// Visibility of the result
    #[serde(default)]
    pub visibility: Visibility,
}

impl AdministrationEvent {
    /// Command family answered from the counter database
    pub const DB: &'static str = "DB";
}

/// A message that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Tag the message arrived with, if any
    pub tag: Option<String>,
    /// Raw message body
    pub payload: Vec<u8>,
    /// Why decoding failed
    pub reason: String,
}

/// Closed set of commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Reply to a status
    Reply(ReplyEvent),
    /// Day rollover
    Update(UpdateEvent),
    /// Counter bump
    Increment(IncrementEvent),
    /// Administrative command
    Administration(AdministrationEvent),
    /// Undecodable message
    Error(ErrorEvent),
}

impl Event {
    /// Message tag for this variant
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Reply(_) => tags::REPLY,
            Self::Update(_) => tags::UPDATE,
            Self::Increment(_) => tags::INCREMENT,
            Self::Administration(_) => tags::ADMINISTRATION,
            Self::Error(_) => tags::ERROR,
        }
    }

    /// Whether this is an undecodable message
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl From<ReplyEvent> for Event {
    fn from(e: ReplyEvent) -> Self {
        Self::Reply(e)
    }
}

impl From<UpdateEvent> for Event {
    fn from(e: UpdateEvent) -> Self {
        Self::Update(e)
    }
}

impl From<IncrementEvent> for Event {
    fn from(e: IncrementEvent) -> Self {
        Self::Increment(e)
    }
}

impl From<AdministrationEvent> for Event {
    fn from(e: AdministrationEvent) -> Self {
        Self::Administration(e)
    }
}

/// Sink for events leaving the producer
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish failure
    type Error: std::error::Error + Send + Sync + 'static;

    /// Publish one event; `Ok` only once delivery is confirmed
    async fn publish(&self, event: &Event) -> Result<(), Self::Error>;

    /// Wait for outstanding confirmations and release the channel
    async fn close(&self) -> Result<(), Self::Error>;
}

#[async_trait]
impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    type Error = T::Error;

    async fn publish(&self, event: &Event) -> Result<(), Self::Error> {
        (**self).publish(event).await
    }

    async fn close(&self) -> Result<(), Self::Error> {
        (**self).close().await
    }
}
