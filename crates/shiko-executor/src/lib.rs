//! Shiko Executor - side effects for consumed events
//!
//! One executor per event variant:
//! - [`ReplyExecutor`] posts packed replies
//! - [`UpdateExecutor`] closes the previous day
//! - [`IncrementExecutor`] bumps today's count
//! - [`AdministrationExecutor`] answers owner queries
//!
//! Executors talk to the outside world through [`Timeline`] and
//! [`CounterStore`]; [`MastodonClient`] and [`SqliteCounterStore`] are the
//! production implementations.

#![warn(unreachable_pub)]

pub mod administration;
pub mod counter;
pub mod error;
pub mod reply;
pub mod store;
pub mod timeline;

use async_trait::async_trait;

// Re-exports for convenience
pub use administration::{format_result, AdministrationExecutor};
pub use counter::{IncrementExecutor, Summary, UpdateExecutor};
pub use error::{ExecutorError, StoreError, TimelineError};
pub use reply::ReplyExecutor;
pub use store::{CounterStore, QueryResult, SqliteCounterStore};
pub use timeline::{MastodonClient, NewStatus, Timeline};

/// Carries out the side effect of one event variant
#[async_trait]
pub trait Executor<E: Send + Sync>: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Perform the side effect
    async fn execute(&self, event: &E) -> Result<(), ExecutorError>;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
