//! Error types for Shiko Stream
//!
//! Distinguishes the failures the ingestor reacts to differently:
//! - Configuration errors are fatal and surface before the loop starts
//! - Connect and transport errors are retried with backoff
//! - Payload errors are reported and the session continues

use crate::state_machine::ConnectionState;

/// Main stream error type
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Server URL could not be turned into a streaming endpoint
    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    /// Opening the connection failed
    #[error("failed to connect: {0}")]
    Connect(String),

    /// Opening the connection took too long
    #[error("connect timed out after {secs}s")]
    ConnectTimeout {
        /// Configured timeout
        secs: u64,
    },

    /// Reading from or writing to an open connection failed
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote end closed the connection
    #[error("connection closed by server")]
    Closed,

    /// A frame could not be decoded
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Internal state machine violation
    #[error("state machine error: {0}")]
    StateMachine(#[from] StateMachineError),
}

impl StreamError {
    /// Check if the error is worth reconnecting for
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connect(_) | Self::ConnectTimeout { .. } | Self::Transport(_) | Self::Closed
        )
    }

    /// Check if the error only affects a single frame
    #[inline]
    #[must_use]
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            Self::Frame(FrameError::Payload { .. } | FrameError::MissingPayload { .. })
        )
    }
}

/// Frame decoding errors
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame envelope is not `{event, payload}` JSON
    #[error("malformed frame: {0}")]
    Envelope(#[source] serde_json::Error),

    /// The payload of a known event kind is malformed
    #[error("malformed {event} payload: {source}")]
    Payload {
        /// Event kind of the frame
        event: String,
        /// Decode failure
        #[source]
        source: serde_json::Error,
    },

    /// A known event kind arrived without a string payload
    #[error("{event} frame without payload")]
    MissingPayload {
        /// Event kind of the frame
        event: String,
    },
}

/// State machine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Transition not allowed from the current state
    #[error("illegal transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// State before
        from: ConnectionState,
        /// Requested state
        to: ConnectionState,
    },
}
