//! Stream ingestor
//!
//! Owns the streaming connection for its whole life:
//! - connects, and on failure waits with exponential backoff
//! - turns status frames into [`Post`]s on the output channel
//! - reconnects when an open session fails, straight away unless the
//!   session lasted less than the backoff floor
//! - on cancellation closes the connection, then the channel
//!
//! Posts published while disconnected are lost.

use crate::error::StreamError;
use crate::frame::decode_frame;
use crate::state_machine::{validate_transition, ConnectionState};
use async_trait::async_trait;
use shiko_core::{Backoff, Post, ShutdownListener};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default capacity of the status channel
pub const STATUS_CHANNEL_CAPACITY: usize = 64;

/// What the ingestor reports to the pipeline
#[derive(Debug)]
pub enum StreamStatus {
    /// A session opened
    Connected {
        /// Server identity reported by the remote end, if any
        server: Option<String>,
    },
    /// An open session failed and was closed
    Disconnected {
        /// Why the session ended
        error: StreamError,
    },
    /// Waiting before the next connect attempt
    Reconnecting {
        /// Wait duration
        after: Duration,
    },
    /// A non-terminal failure
    Error {
        /// What went wrong
        error: StreamError,
    },
    /// A decoded post
    Post(Box<Post>),
}

/// An open streaming session
pub struct Session<S> {
    /// Frame reader
    pub frames: S,
    /// Server identity reported during the handshake
    pub server: Option<String>,
}

/// Opens streaming sessions
#[async_trait]
pub trait Connector: Send + Sync {
    /// Frame reader of an open session
    type Frames: FrameSource;

    /// Open a session
    async fn connect(&self) -> Result<Session<Self::Frames>, StreamError>;
}

/// Reads text frames from an open session
#[async_trait]
pub trait FrameSource: Send {
    /// Next text frame; the end of the stream is [`StreamError::Closed`]
    async fn next_frame(&mut self) -> Result<String, StreamError>;

    /// Close the session
    async fn close(&mut self) -> Result<(), StreamError>;
}

enum SessionEnd {
    Cancelled,
    Failed(StreamError),
}

/// Self-healing reader of the timeline stream
pub struct StreamIngestor<C: Connector> {
    connector: C,
    backoff: Backoff,
    state: ConnectionState,
}

impl<C: Connector + 'static> StreamIngestor<C> {
    /// Create an ingestor with the default backoff
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            backoff: Backoff::default(),
            state: ConnectionState::Disconnected,
        }
    }

    /// Use a custom backoff
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Current connection state
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Run on a background task
    pub fn spawn(
        self,
        shutdown: ShutdownListener,
        capacity: usize,
    ) -> (mpsc::Receiver<StreamStatus>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(self.run(tx, shutdown));
        (rx, handle)
    }

    /// Run until cancelled or until the receiver goes away
    pub async fn run(mut self, tx: mpsc::Sender<StreamStatus>, mut shutdown: ShutdownListener) {
        loop {
            self.transition(ConnectionState::Connecting);
            tracing::debug!("connecting to streaming");

            let connected = tokio::select! {
                biased;
                () = shutdown.wait() => break,
                r = self.connector.connect() => r,
            };

            let session = match connected {
                Ok(session) => session,
                Err(error) => {
                    self.transition(ConnectionState::Disconnected);
                    if !emit(&tx, &mut shutdown, StreamStatus::Error { error }).await {
                        break;
                    }
                    let after = self.backoff.next_delay();
                    if !emit(&tx, &mut shutdown, StreamStatus::Reconnecting { after }).await {
                        break;
                    }
                    tokio::select! {
                        biased;
                        () = shutdown.wait() => break,
                        () = tokio::time::sleep(after) => continue,
                    }
                }
            };

            self.backoff.reset();
            let opened = Instant::now();
            self.transition(ConnectionState::Connected);
            let Session { mut frames, server } = session;
            tracing::info!(server = server.as_deref().unwrap_or("unknown"), "connected to streaming");

            let end = if emit(&tx, &mut shutdown, StreamStatus::Connected { server }).await {
                read_session(&mut frames, &tx, &mut shutdown).await
            } else {
                SessionEnd::Cancelled
            };

            match end {
                SessionEnd::Cancelled => {
                    if let Err(e) = frames.close().await {
                        tracing::warn!(error = %e, "failed to close streaming connection");
                    }
                    break;
                }
                SessionEnd::Failed(error) => {
                    self.transition(ConnectionState::Disconnected);
                    let close = frames.close().await;
                    if !emit(&tx, &mut shutdown, StreamStatus::Disconnected { error }).await {
                        break;
                    }
                    if let Err(error) = close {
                        if !emit(&tx, &mut shutdown, StreamStatus::Error { error }).await {
                            break;
                        }
                    }

                    let after = self.backoff.floor();
                    if opened.elapsed() < after {
                        tracing::warn!(after = ?after, "streaming session ended right after opening");
                        if !emit(&tx, &mut shutdown, StreamStatus::Reconnecting { after }).await {
                            break;
                        }
                        tokio::select! {
                            biased;
                            () = shutdown.wait() => break,
                            () = tokio::time::sleep(after) => {}
                        }
                    }
                }
            }
        }

        self.transition(ConnectionState::Stopped);
        tracing::debug!("streaming stopped");
    }

    fn transition(&mut self, to: ConnectionState) {
        match validate_transition(self.state, to) {
            Ok(()) => self.state = to,
            Err(e) => tracing::error!(error = %e, "ignoring invalid connection state change"),
        }
    }
}

async fn read_session<S: FrameSource>(
    frames: &mut S,
    tx: &mpsc::Sender<StreamStatus>,
    shutdown: &mut ShutdownListener,
) -> SessionEnd {
    loop {
        let frame = tokio::select! {
            biased;
            () = shutdown.wait() => return SessionEnd::Cancelled,
            f = frames.next_frame() => f,
        };
        let text = match frame {
            Ok(text) => text,
            Err(e) => return SessionEnd::Failed(e),
        };

        let status = match decode_frame(&text) {
            Ok(Some(post)) => StreamStatus::Post(Box::new(post)),
            Ok(None) => continue,
            Err(e) => {
                let error = StreamError::from(e);
                if !error.is_frame_local() {
                    return SessionEnd::Failed(error);
                }
                StreamStatus::Error { error }
            }
        };
        if !emit(tx, shutdown, status).await {
            return SessionEnd::Cancelled;
        }
    }
}

/// Send a status unless cancelled first; `false` means stop.
async fn emit(
    tx: &mpsc::Sender<StreamStatus>,
    shutdown: &mut ShutdownListener,
    status: StreamStatus,
) -> bool {
    tokio::select! {
        biased;
        () = shutdown.wait() => false,
        r = tx.send(status) => r.is_ok(),
    }
}
