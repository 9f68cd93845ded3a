//! Shiko Actions - triggers shipped with the bot
//!
//! - [`OfutonAction`]: answers `おふとんチャレンジ` with four random kana
//! - [`PyuUpdateAction`]: counts the owner's `ぴゅっ♡` posts
//! - [`SqlAction`]: runs the owner's `SQL:` posts against the counter store
//!
//! [`default_actions`] registers them in the order the bot uses.

#![warn(unreachable_pub)]

pub mod counter;
pub mod ofuton;
pub mod random;
pub mod sql;

// Re-exports for convenience
pub use counter::PyuUpdateAction;
pub use ofuton::{OfutonAction, CHALLENGE_TAG};
pub use random::{Random, SequenceRandom, ThreadRandom};
pub use sql::SqlAction;

use shiko_core::Dispatcher;

/// Dispatcher with every shipped trigger, for the given bot account
#[must_use]
pub fn default_actions(own_account_id: &str) -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    dispatcher
        .register(OfutonAction::new(own_account_id))
        .register(PyuUpdateAction::new(own_account_id))
        .register(SqlAction::new(own_account_id));
    dispatcher
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
