//! Trigger contract
//!
//! An [`Action`] is a named, stateless capability with two steps:
//! [`Action::target`] is a cheap, side-effect free filter, and
//! [`Action::produce`] builds the event (and may do I/O).

use crate::error::ActionError;
use crate::event::Event;
use crate::types::Post;
use async_trait::async_trait;
use std::fmt;

/// Position of a trigger match in the post content, in UTF-8 bytes
///
/// Used only to rank competing triggers: the smallest offset wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MatchOffset(pub usize);

impl MatchOffset {
    /// Offset of the start of the post
    pub const START: Self = Self(0);

    /// Raw byte offset
    #[inline]
    #[must_use]
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for MatchOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for MatchOffset {
    fn from(offset: usize) -> Self {
        Self(offset)
    }
}

/// Event built by a trigger, with the position it matched at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Produced {
    /// The event to publish
    pub event: Event,
    /// Where the trigger matched
    pub offset: MatchOffset,
}

impl Produced {
    /// Create a produced event
    pub fn new(event: impl Into<Event>, offset: impl Into<MatchOffset>) -> Self {
        Self {
            event: event.into(),
            offset: offset.into(),
        }
    }
}

/// A text trigger
#[async_trait]
pub trait Action: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Whether this trigger is interested in the post
    fn target(&self, post: &Post) -> bool;

    /// Build the event for a targeted post
    async fn produce(&self, post: &Post) -> Result<Produced, ActionError>;
}
