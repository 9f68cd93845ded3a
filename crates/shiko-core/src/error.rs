//! Error types for Shiko Core
//!
//! Covers the failure modes of the in-process stages:
//! - Trigger produce failures
//! - Dispatch outcomes with no winner
//! - Reply body read failures

/// Failure of a single trigger while producing its event
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// Targeted post did not contain the trigger pattern
    #[error("pattern not found in post {post_id}")]
    PatternNotFound {
        /// Post that was examined
        post_id: String,
    },

    /// A collaborator (HTTP service, random source) failed
    #[error("upstream failed: {0}")]
    Upstream(String),

    /// Post timestamp could not be mapped to a calendar day
    #[error("invalid post date: {0}")]
    InvalidDate(String),
}

impl ActionError {
    /// Check if the failure may succeed on a later post
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }
}

/// A trigger that was targeted but failed to produce
#[derive(Debug)]
pub struct ActionFailure {
    /// Name of the trigger
    pub action: String,
    /// What went wrong
    pub error: ActionError,
}

/// Dispatch outcome without a winner
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No trigger produced an event for the post
    #[error("no action matched ({} failed)", .failures.len())]
    NoMatch {
        /// Triggers that were targeted but failed, in registration order
        failures: Vec<ActionFailure>,
    },
}

impl DispatchError {
    /// Check if no trigger was interested at all
    #[inline]
    #[must_use]
    pub fn is_untargeted(&self) -> bool {
        match self {
            Self::NoMatch { failures } => failures.is_empty(),
        }
    }
}

/// Reply body could not be read to completion
///
/// `partial` holds what had been accepted before the failure; it must not
/// be sent.
#[derive(Debug, thiserror::Error)]
#[error("failed to read reply body after {} bytes: {source}", .partial.len())]
pub struct PackError {
    /// Text accumulated before the read failed
    pub partial: String,
    /// Read failure
    #[source]
    pub source: std::io::Error,
}
