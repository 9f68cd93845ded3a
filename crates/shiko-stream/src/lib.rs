//! Shiko Stream - self-healing timeline stream ingestor
//!
//! Keeps one streaming connection alive and turns its frames into posts:
//! - Connection state machine with validated transitions
//! - Exponential reconnect backoff (5s doubling to 320s)
//! - Mastodon frame decoding with markup stripping
//! - WebSocket transport behind the [`Connector`] seam
//!
//! # Example
//!
//! ```rust,ignore
//! use shiko_core::Shutdown;
//! use shiko_stream::{StreamIngestor, WebSocketConnector, STATUS_CHANNEL_CAPACITY};
//!
//! # fn example() -> Result<(), shiko_stream::StreamError> {
//! let shutdown = Shutdown::new();
//! let connector = WebSocketConnector::new("https://example.com", "token", "user")?;
//! let (statuses, handle) =
//!     StreamIngestor::new(connector).spawn(shutdown.listener(), STATUS_CHANNEL_CAPACITY);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod frame;
pub mod ingestor;
pub mod state_machine;
pub mod websocket;

// Re-exports for convenience
pub use shiko_core::{Backoff, RECONNECT_CEILING, RECONNECT_FLOOR};
pub use error::{FrameError, StateMachineError, StreamError};
pub use frame::{decode_frame, html_to_text};
pub use ingestor::{
    Connector, FrameSource, Session, StreamIngestor, StreamStatus, STATUS_CHANNEL_CAPACITY,
};
pub use state_machine::{allowed_transitions, validate_transition, ConnectionState};
pub use websocket::{streaming_url, WebSocketConnector, WebSocketFrames};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
