//! Command line and environment configuration
//!
//! Every option can come from a flag or from the environment. Both
//! processes share the logging options; the rest is per subcommand.

use crate::logging::LogFormat;
use clap::{value_parser, Arg, ArgMatches, Command};
use shiko_broker::{BrokerConfig, DEFAULT_EXCHANGE, DEFAULT_QUEUE, DEFAULT_ROUTING_KEY};
use std::path::PathBuf;

/// Errors turning parsed arguments into a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A value clap should have enforced is absent
    #[error("missing required option: {0}")]
    Missing(&'static str),

    /// No subcommand given
    #[error("no subcommand given, expected `supplier` or `reactor`")]
    NoSubcommand,
}

/// Mastodon connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MastodonConfig {
    /// Server base URL
    pub server_url: String,
    /// Access token
    pub access_token: String,
}

/// Producer process settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierConfig {
    /// Timeline server
    pub mastodon: MastodonConfig,
    /// Streaming channel, e.g. `user`
    pub stream: String,
    /// The bot's own account ID
    pub user_id: String,
    /// Broker
    pub broker: BrokerConfig,
}

/// Consumer process settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactorConfig {
    /// Timeline server
    pub mastodon: MastodonConfig,
    /// Broker
    pub broker: BrokerConfig,
    /// SQLite database file
    pub db_path: PathBuf,
    /// Account whose daily counts are closed at midnight
    pub user_id: String,
}

/// Which process to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Stream, dispatch and publish
    Supplier(SupplierConfig),
    /// Consume and execute
    Reactor(ReactorConfig),
}

/// Full configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Default log filter directive
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Selected process
    pub mode: Mode,
}

fn required(id: &'static str, env: &'static str, help: &'static str) -> Arg {
    Arg::new(id).long(id).env(env).required(true).help(help)
}

fn optional(id: &'static str, env: &'static str, default: &'static str, help: &'static str) -> Arg {
    Arg::new(id).long(id).env(env).default_value(default).help(help)
}

fn mastodon_args(command: Command) -> Command {
    command
        .arg(required("server-url", "MASTODON_SERVER_URL", "Mastodon server base URL"))
        .arg(
            required("access-token", "MASTODON_ACCESS_TOKEN", "Mastodon access token")
                .hide_env_values(true),
        )
}

fn broker_args(command: Command) -> Command {
    command
        .arg(required("mq-uri", "MQ_URI", "AMQP URI").hide_env_values(true))
        .arg(optional("mq-exchange", "MQ_EXCHANGE", DEFAULT_EXCHANGE, "Topic exchange"))
        .arg(optional(
            "mq-routing-key",
            "MQ_ROUTING_KEY",
            DEFAULT_ROUTING_KEY,
            "Routing key",
        ))
}

/// The `shiko` command
#[must_use]
pub fn command() -> Command {
    let supplier = Command::new("supplier")
        .about("Stream the timeline, dispatch triggers and publish events")
        .arg(optional("stream", "MASTODON_STREAM", "user", "Streaming channel"))
        .arg(required("user-id", "MASTODON_USER_ID", "The bot's own account ID"));

    let reactor = Command::new("reactor")
        .about("Consume events and execute them")
        .arg(optional("mq-queue", "MQ_QUEUE", DEFAULT_QUEUE, "Queue to consume"))
        .arg(
            required("db-path", "DB_PATH", "SQLite database file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(required("counter-user", "USER_ID", "Account whose daily count is closed at midnight"));

    Command::new("shiko")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Reactive timeline bot")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .env("LOG_LEVEL")
                .global(true)
                .default_value("info")
                .help("Default log filter; RUST_LOG takes precedence"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .env("LOG_FORMAT")
                .global(true)
                .default_value("text")
                .value_parser(["text", "json"])
                .help("Log output format"),
        )
        .subcommand(broker_args(mastodon_args(supplier)))
        .subcommand(broker_args(mastodon_args(reactor)))
}

fn string(matches: &ArgMatches, id: &'static str) -> Result<String, ConfigError> {
    matches
        .get_one::<String>(id)
        .cloned()
        .ok_or(ConfigError::Missing(id))
}

fn mastodon(matches: &ArgMatches) -> Result<MastodonConfig, ConfigError> {
    Ok(MastodonConfig {
        server_url: string(matches, "server-url")?,
        access_token: string(matches, "access-token")?,
    })
}

fn broker(matches: &ArgMatches, queue: Option<String>) -> Result<BrokerConfig, ConfigError> {
    let mut config = BrokerConfig::new(string(matches, "mq-uri")?);
    config.exchange = string(matches, "mq-exchange")?;
    config.routing_key = string(matches, "mq-routing-key")?;
    if let Some(queue) = queue {
        config.queue = queue;
    }
    Ok(config)
}

impl Config {
    /// Build from parsed arguments
    ///
    /// # Errors
    ///
    /// Fails when a required value is absent; with [`command`] clap
    /// reports those before this runs.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, ConfigError> {
        let mode = match matches.subcommand() {
            Some(("supplier", sub)) => Mode::Supplier(SupplierConfig {
                mastodon: mastodon(sub)?,
                stream: string(sub, "stream")?,
                user_id: string(sub, "user-id")?,
                broker: broker(sub, None)?,
            }),
            Some(("reactor", sub)) => Mode::Reactor(ReactorConfig {
                mastodon: mastodon(sub)?,
                broker: broker(sub, Some(string(sub, "mq-queue")?))?,
                db_path: sub
                    .get_one::<PathBuf>("db-path")
                    .cloned()
                    .ok_or(ConfigError::Missing("db-path"))?,
                user_id: string(sub, "counter-user")?,
            }),
            _ => return Err(ConfigError::NoSubcommand),
        };

        let log_format = match matches.get_one::<String>("log-format").map(String::as_str) {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            log_level: string(matches, "log-level")?,
            log_format,
            mode,
        })
    }
}
