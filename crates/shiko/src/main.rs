use anyhow::Context;
use shiko::{
    command, logging, Config, DailyScheduler, Mode, Producer, Reactor, ReactorConfig,
    SupplierConfig,
};
use shiko_broker::{
    AmqpConfirmChannel, AmqpMessageSource, Publisher, Subscriber, EVENT_CHANNEL_CAPACITY,
};
use shiko_core::Shutdown;
use shiko_executor::{
    AdministrationExecutor, IncrementExecutor, MastodonClient, ReplyExecutor, SqliteCounterStore,
    UpdateExecutor,
};
use shiko_stream::{StreamIngestor, WebSocketConnector, STATUS_CHANNEL_CAPACITY};
use std::sync::Arc;

const CONSUMER_TAG: &str = "shiko-reactor";

#[tokio::main]
async fn main() {
    let matches = command().get_matches();
    let config = match Config::from_matches(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(&config.log_level, config.log_format) {
        eprintln!("failed to initialise logging: {e}");
    }

    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
        }
        signal.trigger();
    });

    let result = match config.mode {
        Mode::Supplier(supplier) => run_supplier(supplier, &shutdown).await,
        Mode::Reactor(reactor) => run_reactor(reactor, &shutdown).await,
    };

    if let Err(e) = result {
        tracing::error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run_supplier(config: SupplierConfig, shutdown: &Shutdown) -> anyhow::Result<()> {
    let connector = WebSocketConnector::new(
        &config.mastodon.server_url,
        &config.mastodon.access_token,
        &config.stream,
    )
    .context("invalid streaming endpoint")?;
    tracing::info!(endpoint = %connector.endpoint(), "supplier starting");

    let channel = AmqpConfirmChannel::open(&config.broker)
        .await
        .context("failed to open broker channel")?;
    let publisher = Publisher::new(channel, &config.broker.exchange, &config.broker.routing_key);

    let (statuses, ingestor) =
        StreamIngestor::new(connector).spawn(shutdown.listener(), STATUS_CHANNEL_CAPACITY);
    let (ticks, scheduler) = DailyScheduler::new().spawn(shutdown.listener());

    let producer = Producer::new(shiko_actions::default_actions(&config.user_id), publisher);
    let closed = producer.run(statuses, ticks, shutdown.listener()).await;

    shutdown.trigger();
    let _ = tokio::join!(ingestor, scheduler);
    closed.context("failed to close publisher")
}

async fn run_reactor(config: ReactorConfig, shutdown: &Shutdown) -> anyhow::Result<()> {
    let timeline = Arc::new(
        MastodonClient::new(&config.mastodon.server_url, config.mastodon.access_token.clone())
            .context("failed to build timeline client")?,
    );
    let store = Arc::new(
        SqliteCounterStore::open(&config.db_path)
            .with_context(|| format!("failed to open {}", config.db_path.display()))?,
    );
    let source = AmqpMessageSource::open(&config.broker, CONSUMER_TAG)
        .await
        .context("failed to open broker consumer")?;
    tracing::info!(queue = %config.broker.queue, "reactor starting");

    let reactor = Reactor::new(
        ReplyExecutor::new(Arc::clone(&timeline)),
        UpdateExecutor::new(Arc::clone(&timeline), Arc::clone(&store), config.user_id.clone()),
        IncrementExecutor::new(Arc::clone(&timeline), Arc::clone(&store)),
        AdministrationExecutor::new(timeline, store),
    );

    let (events, subscriber) =
        Subscriber::new(source).spawn(shutdown.listener(), EVENT_CHANNEL_CAPACITY);
    reactor.run(events, shutdown.listener()).await;

    let interrupted = shutdown.is_triggered();
    shutdown.trigger();
    subscriber.await.context("subscriber task failed")?;
    anyhow::ensure!(interrupted, "event stream ended without a shutdown signal");
    Ok(())
}
