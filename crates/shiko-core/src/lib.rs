//! Shiko Core - timeline model and in-process pipeline stages
//!
//! Everything between "a post arrived" and "an event is ready to publish",
//! plus the reply packer used on the consuming side:
//! - Post and account model
//! - Event sum type with stable message tags
//! - Trigger contract and earliest-match dispatcher
//! - Grapheme-aware reply packer
//! - Process-wide cancellation signal
//! - Reconnect backoff shared by the stream and broker clients
//!
//! # Example
//!
//! ```rust,ignore
//! use shiko_core::{Dispatcher, Post};
//!
//! # async fn example(dispatcher: Dispatcher, post: Post) {
//! match dispatcher.dispatch(&post).await {
//!     Ok(dispatched) => println!("{} won at {}", dispatched.action, dispatched.offset),
//!     Err(e) => println!("{e}"),
//! }
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod action;
pub mod backoff;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod packer;
pub mod shutdown;
pub mod types;

// Re-exports for convenience
pub use action::{Action, MatchOffset, Produced};
pub use backoff::{Backoff, RECONNECT_CEILING, RECONNECT_FLOOR};
pub use dispatcher::{Dispatched, Dispatcher};
pub use error::{ActionError, ActionFailure, DispatchError, PackError};
pub use event::{
    tags, AdministrationEvent, ErrorEvent, Event, EventPublisher, IncrementEvent, ReplyEvent,
    UpdateEvent,
};
pub use packer::{
    collapse_mentions, pack, perceived_len, Packer, MAX_GRAPHEME_BYTES, MAX_STATUS_LENGTH,
};
pub use shutdown::{Shutdown, ShutdownListener};
pub use types::{Account, Post, Visibility};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing triggers and pipeline stages
    pub use crate::{
        Account, Action, ActionError, Dispatcher, Event, MatchOffset, Post, Produced, Shutdown,
        ShutdownListener, Visibility,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
