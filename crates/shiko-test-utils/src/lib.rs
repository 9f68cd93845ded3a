//! Testing utilities for Shiko workspace
//!
//! Shared fixtures and recording doubles.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use shiko_core::{
    Account, Action, ActionError, Event, EventPublisher, Post, Produced, ReplyEvent, Visibility,
};
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

pub const BOT_ACCOUNT_ID: &str = "1";

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn create_test_account(id: &str, acct: &str) -> Account {
    Account::new(id, acct)
}

pub fn create_test_post_by(account: Account, content: &str) -> Post {
    Post::new("100", account, content).with_created_at(fixed_time())
}

pub fn create_test_post(content: &str) -> Post {
    create_test_post_by(create_test_account("42", "alice@example.com"), content)
}

pub fn create_own_post(content: &str) -> Post {
    create_test_post_by(create_test_account(BOT_ACCOUNT_ID, "shiko"), content)
}

/// Action with a scripted outcome. Produces a reply whose body is its name.
#[derive(Debug)]
pub struct StubAction {
    name: String,
    targets: bool,
    offset: Option<usize>,
    produced: AtomicUsize,
}

impl StubAction {
    pub fn matching(name: &str, offset: usize) -> Self {
        Self {
            name: name.to_string(),
            targets: true,
            offset: Some(offset),
            produced: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            targets: true,
            offset: None,
            produced: AtomicUsize::new(0),
        }
    }

    pub fn ignoring(name: &str) -> Self {
        Self {
            name: name.to_string(),
            targets: false,
            offset: Some(0),
            produced: AtomicUsize::new(0),
        }
    }

    pub fn produce_calls(&self) -> usize {
        self.produced.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Action for StubAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn target(&self, _post: &Post) -> bool {
        self.targets
    }

    async fn produce(&self, post: &Post) -> Result<Produced, ActionError> {
        self.produced.fetch_add(1, Ordering::SeqCst);
        let offset = self.offset.ok_or_else(|| ActionError::Upstream(format!("{} failed", self.name)))?;
        Ok(Produced::new(
            ReplyEvent {
                in_reply_to: post.id.clone(),
                acct: post.account.acct.clone(),
                body: self.name.clone(),
                visibility: Visibility::Public,
            },
            offset,
        ))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("publish rejected: {0}")]
pub struct RejectedError(pub String);

/// Publisher that records every event it accepts
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<Event>>,
    reject_next: AtomicUsize,
    closed: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `n` publishes
    pub fn reject_next(&self, n: usize) {
        self.reject_next.store(n, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    type Error = RejectedError;

    async fn publish(&self, event: &Event) -> Result<(), RejectedError> {
        let rejected = self
            .reject_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            return Err(RejectedError(event.tag().to_string()));
        }
        self.events.lock().push(event.clone());
        Ok(())
    }

    async fn close(&self) -> Result<(), RejectedError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Reader that yields one scripted chunk per read, then EOF or an error
#[derive(Debug)]
pub struct ChunkedReader {
    chunks: VecDeque<Vec<u8>>,
    fail_after: bool,
    consumed: Arc<AtomicUsize>,
    dropped: Arc<AtomicBool>,
}

/// Observes a [`ChunkedReader`] after it has been moved away
#[derive(Debug, Clone)]
pub struct ReaderTracker {
    consumed: Arc<AtomicUsize>,
    dropped: Arc<AtomicBool>,
    total: usize,
}

impl ReaderTracker {
    pub fn fully_consumed(&self) -> bool {
        self.consumed.load(Ordering::SeqCst) == self.total
    }

    pub fn dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

impl ChunkedReader {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            fail_after: false,
            consumed: Arc::new(AtomicUsize::new(0)),
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fail with `BrokenPipe` once the chunks run out
    #[must_use]
    pub fn then_fail(mut self) -> Self {
        self.fail_after = true;
        self
    }

    pub fn tracker(&self) -> ReaderTracker {
        ReaderTracker {
            consumed: Arc::clone(&self.consumed),
            dropped: Arc::clone(&self.dropped),
            total: self.chunks.iter().map(Vec::len).sum(),
        }
    }
}

impl Drop for ChunkedReader {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

impl AsyncRead for ChunkedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.chunks.pop_front() {
            Some(mut chunk) => {
                let n = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..n]);
                self.consumed.fetch_add(n, Ordering::SeqCst);
                if n < chunk.len() {
                    let rest = chunk.split_off(n);
                    self.chunks.push_front(rest);
                }
                Poll::Ready(Ok(()))
            }
            None if self.fail_after => {
                // Fail once; later reads (e.g. while draining) see EOF.
                self.fail_after = false;
                Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "body reset")))
            }
            None => Poll::Ready(Ok(())),
        }
    }
}
