//! Shiko - process wiring for the timeline bot
//!
//! Two processes share a broker:
//! - `supplier`: stream ingestor and daily scheduler feed the dispatcher,
//!   winning events are published
//! - `reactor`: the subscriber feeds executors
//!
//! This crate holds the configuration, logging setup, scheduler and the
//! producer/consumer loops; `main.rs` only connects them to real transports.

#![warn(unreachable_pub)]

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod scheduler;

// Re-exports for convenience
pub use config::{command, Config, ConfigError, Mode, ReactorConfig, SupplierConfig};
pub use logging::LogFormat;
pub use pipeline::{Producer, Reactor};
pub use scheduler::{next_fire, DailyScheduler, TICK_CHANNEL_CAPACITY};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
