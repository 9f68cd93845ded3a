//! Producer and consumer loops
//!
//! The producer drains the stream and the daily ticks, dispatches posts
//! and publishes the winning events. The consumer routes decoded events to
//! their executors, one at a time. Neither loop stops on a failed item.

use shiko_core::{
    AdministrationEvent, Dispatcher, Event, EventPublisher, IncrementEvent, Post, ReplyEvent,
    ShutdownListener, UpdateEvent,
};
use shiko_executor::{Executor, ExecutorError};
use shiko_stream::StreamStatus;
use tokio::sync::mpsc;

/// Stream and ticks in, published events out
pub struct Producer<P> {
    dispatcher: Dispatcher,
    publisher: P,
}

impl<P: EventPublisher> Producer<P> {
    pub fn new(dispatcher: Dispatcher, publisher: P) -> Self {
        Self {
            dispatcher,
            publisher,
        }
    }

    /// Run until both inputs close or the signal is raised, then close the
    /// publisher
    ///
    /// An item already being handled when the signal arrives is finished.
    ///
    /// # Errors
    ///
    /// Only closing the publisher can fail; per-item failures are logged.
    pub async fn run(
        self,
        mut statuses: mpsc::Receiver<StreamStatus>,
        mut ticks: mpsc::Receiver<UpdateEvent>,
        mut shutdown: ShutdownListener,
    ) -> Result<(), P::Error> {
        let mut statuses_open = true;
        let mut ticks_open = true;

        while statuses_open || ticks_open {
            tokio::select! {
                biased;
                () = shutdown.wait() => break,
                status = statuses.recv(), if statuses_open => match status {
                    Some(status) => self.handle_status(status).await,
                    None => statuses_open = false,
                },
                tick = ticks.recv(), if ticks_open => match tick {
                    Some(tick) => self.publish(&tick.into()).await,
                    None => ticks_open = false,
                },
            }
        }

        tracing::info!("producer stopping, draining publisher");
        self.publisher.close().await
    }

    async fn handle_status(&self, status: StreamStatus) {
        match status {
            StreamStatus::Post(post) => self.handle_post(&post).await,
            StreamStatus::Connected { server } => {
                tracing::info!(server = server.as_deref().unwrap_or("unknown"), "stream connected");
            }
            StreamStatus::Disconnected { error } => {
                tracing::info!(error = %error, "stream disconnected");
            }
            StreamStatus::Reconnecting { after } => {
                tracing::info!(after_secs = after.as_secs(), "stream reconnecting");
            }
            StreamStatus::Error { error } => {
                tracing::error!(error = %error, "stream error");
            }
        }
    }

    async fn handle_post(&self, post: &Post) {
        match self.dispatcher.dispatch(post).await {
            Ok(dispatched) => {
                tracing::debug!(
                    post_id = %post.id,
                    action = %dispatched.action,
                    offset = %dispatched.offset,
                    "post dispatched"
                );
                self.publish(&dispatched.event).await;
            }
            Err(e) if e.is_untargeted() => {}
            Err(e) => tracing::warn!(post_id = %post.id, error = %e, "no event for post"),
        }
    }

    async fn publish(&self, event: &Event) {
        match self.publisher.publish(event).await {
            Ok(()) => tracing::debug!(tag = event.tag(), "event published"),
            Err(e) => tracing::error!(tag = event.tag(), error = %e, "publish failed"),
        }
    }
}

/// Routes decoded events to executors
pub struct Reactor {
    reply: Box<dyn Executor<ReplyEvent>>,
    update: Box<dyn Executor<UpdateEvent>>,
    increment: Box<dyn Executor<IncrementEvent>>,
    administration: Box<dyn Executor<AdministrationEvent>>,
}

impl Reactor {
    pub fn new(
        reply: impl Executor<ReplyEvent> + 'static,
        update: impl Executor<UpdateEvent> + 'static,
        increment: impl Executor<IncrementEvent> + 'static,
        administration: impl Executor<AdministrationEvent> + 'static,
    ) -> Self {
        Self {
            reply: Box::new(reply),
            update: Box::new(update),
            increment: Box::new(increment),
            administration: Box::new(administration),
        }
    }

    /// Execute one event
    ///
    /// Undecodable events are logged and count as handled.
    ///
    /// # Errors
    ///
    /// Returns the executor's failure.
    pub async fn route(&self, event: &Event) -> Result<(), ExecutorError> {
        match event {
            Event::Reply(e) => self.reply.execute(e).await,
            Event::Update(e) => self.update.execute(e).await,
            Event::Increment(e) => self.increment.execute(e).await,
            Event::Administration(e) => self.administration.execute(e).await,
            Event::Error(e) => {
                tracing::error!(
                    tag = e.tag.as_deref().unwrap_or("none"),
                    bytes = e.payload.len(),
                    reason = %e.reason,
                    "undecodable event dropped"
                );
                Ok(())
            }
        }
    }

    fn executor_name(&self, event: &Event) -> &'static str {
        match event {
            Event::Reply(_) => self.reply.name(),
            Event::Update(_) => self.update.name(),
            Event::Increment(_) => self.increment.name(),
            Event::Administration(_) => self.administration.name(),
            Event::Error(_) => "none",
        }
    }

    /// Consume until the channel closes or the signal is raised
    pub async fn run(&self, mut events: mpsc::Receiver<Event>, mut shutdown: ShutdownListener) {
        loop {
            let event = tokio::select! {
                biased;
                () = shutdown.wait() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match self.route(&event).await {
                Ok(()) => tracing::debug!(tag = event.tag(), "event executed"),
                Err(e) => tracing::error!(
                    executor = self.executor_name(&event),
                    error = %e,
                    "executor failed"
                ),
            }
        }
        tracing::info!("reactor stopped");
    }
}
