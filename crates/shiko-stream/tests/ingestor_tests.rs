use async_trait::async_trait;
use shiko_core::Shutdown;
use shiko_stream::{
    Connector, FrameSource, Session, StreamError, StreamIngestor, StreamStatus,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

enum Step {
    Frame(String),
    Wait(Duration),
    Fail,
}

enum Attempt {
    Refuse,
    Accept(Vec<Step>),
    AcceptBrokenClose(Vec<Step>),
}

#[derive(Clone, Default)]
struct Tracker {
    attempts: Arc<Mutex<Vec<Instant>>>,
    closed: Arc<AtomicUsize>,
}

struct ScriptedConnector {
    script: Mutex<VecDeque<Attempt>>,
    tracker: Tracker,
}

impl ScriptedConnector {
    fn new(script: Vec<Attempt>) -> (Self, Tracker) {
        let tracker = Tracker::default();
        (
            Self {
                script: Mutex::new(script.into()),
                tracker: tracker.clone(),
            },
            tracker,
        )
    }
}

struct ScriptedFrames {
    steps: VecDeque<Step>,
    closed: Arc<AtomicUsize>,
    broken_close: bool,
}

impl ScriptedConnector {
    fn session(&self, steps: Vec<Step>, broken_close: bool) -> Session<ScriptedFrames> {
        Session {
            frames: ScriptedFrames {
                steps: steps.into(),
                closed: Arc::clone(&self.tracker.closed),
                broken_close,
            },
            server: Some("backend-1".into()),
        }
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Frames = ScriptedFrames;

    async fn connect(&self) -> Result<Session<ScriptedFrames>, StreamError> {
        self.tracker.attempts.lock().unwrap().push(Instant::now());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Attempt::Refuse) => Err(StreamError::Connect("refused".into())),
            Some(Attempt::Accept(steps)) => Ok(self.session(steps, false)),
            Some(Attempt::AcceptBrokenClose(steps)) => Ok(self.session(steps, true)),
            None => std::future::pending().await,
        }
    }
}

#[async_trait]
impl FrameSource for ScriptedFrames {
    async fn next_frame(&mut self) -> Result<String, StreamError> {
        loop {
            match self.steps.pop_front() {
                Some(Step::Frame(text)) => return Ok(text),
                Some(Step::Wait(d)) => tokio::time::sleep(d).await,
                Some(Step::Fail) => return Err(StreamError::Transport("reset".into())),
                None => std::future::pending().await,
            }
        }
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        if self.broken_close {
            return Err(StreamError::Transport("close failed".into()));
        }
        Ok(())
    }
}

fn update_frame(id: &str, content: &str) -> String {
    let status = serde_json::json!({
        "id": id,
        "account": {"id": "42", "acct": "alice", "display_name": "Alice", "username": "alice"},
        "created_at": "2024-05-01T12:00:00Z",
        "content": content,
        "visibility": "public"
    });
    serde_json::json!({"event": "update", "payload": status.to_string()}).to_string()
}

fn label(status: &StreamStatus) -> String {
    match status {
        StreamStatus::Connected { server } => format!("connected:{}", server.as_deref().unwrap_or("")),
        StreamStatus::Disconnected { .. } => "disconnected".into(),
        StreamStatus::Reconnecting { after } => format!("reconnecting:{}", after.as_secs()),
        StreamStatus::Error { .. } => "error".into(),
        StreamStatus::Post(post) => format!("post:{}", post.id),
    }
}

#[tokio::test(start_paused = true)]
async fn test_backoff_doubles_then_resets_after_success() {
    let (connector, tracker) = ScriptedConnector::new(vec![
        Attempt::Refuse,
        Attempt::Refuse,
        Attempt::Refuse,
        Attempt::Accept(vec![Step::Fail]),
        Attempt::Refuse,
    ]);
    let shutdown = Shutdown::new();
    let (mut rx, handle) = StreamIngestor::new(connector).spawn(shutdown.listener(), 8);

    let mut labels = Vec::new();
    while labels.len() < 10 {
        labels.push(label(&rx.recv().await.unwrap()));
    }
    assert_eq!(
        labels,
        [
            "error",
            "reconnecting:5",
            "error",
            "reconnecting:10",
            "error",
            "reconnecting:20",
            "connected:backend-1",
            "disconnected",
            "reconnecting:5",
            "error",
        ]
    );
    assert_eq!(label(&rx.recv().await.unwrap()), "reconnecting:5");

    let attempts = tracker.attempts.lock().unwrap().clone();
    let gaps: Vec<u64> = attempts.windows(2).map(|w| (w[1] - w[0]).as_secs()).collect();
    // a session dropped right after opening waits the floor
    assert_eq!(gaps[..4], [5, 10, 20, 5]);

    shutdown.trigger();
    handle.await.unwrap();
    assert_eq!(tracker.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_long_session_reconnects_straight_away() {
    let (connector, tracker) = ScriptedConnector::new(vec![
        Attempt::Accept(vec![Step::Wait(Duration::from_secs(60)), Step::Fail]),
        Attempt::Refuse,
    ]);
    let shutdown = Shutdown::new();
    let (mut rx, handle) = StreamIngestor::new(connector).spawn(shutdown.listener(), 8);

    let mut labels = Vec::new();
    while labels.len() < 4 {
        labels.push(label(&rx.recv().await.unwrap()));
    }
    assert_eq!(labels, ["connected:backend-1", "disconnected", "error", "reconnecting:5"]);

    let attempts = tracker.attempts.lock().unwrap().clone();
    assert_eq!((attempts[1] - attempts[0]).as_secs(), 60);

    shutdown.trigger();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_close_failure_is_a_second_status() {
    let (connector, tracker) =
        ScriptedConnector::new(vec![Attempt::AcceptBrokenClose(vec![Step::Fail])]);
    let shutdown = Shutdown::new();
    let (mut rx, handle) = StreamIngestor::new(connector).spawn(shutdown.listener(), 8);

    assert_eq!(label(&rx.recv().await.unwrap()), "connected:backend-1");
    match rx.recv().await.unwrap() {
        StreamStatus::Disconnected { error } => {
            assert!(matches!(error, StreamError::Transport(ref m) if m == "reset"));
        }
        other => panic!("unexpected {other:?}"),
    }
    match rx.recv().await.unwrap() {
        StreamStatus::Error { error } => {
            assert!(matches!(error, StreamError::Transport(ref m) if m == "close failed"));
        }
        other => panic!("unexpected {other:?}"),
    }
    // not fatal: the ingestor goes on to reconnect
    assert_eq!(label(&rx.recv().await.unwrap()), "reconnecting:5");
    assert_eq!(tracker.closed.load(Ordering::SeqCst), 1);

    shutdown.trigger();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_frames_become_posts_and_bad_payloads_are_reported() {
    let (connector, _tracker) = ScriptedConnector::new(vec![Attempt::Accept(vec![
        Step::Frame(update_frame("1", "<p>one</p>")),
        Step::Frame(r#"{"event":"delete","payload":"1"}"#.into()),
        Step::Frame(r#"{"event":"update","payload":"{"}"#.into()),
        Step::Frame(update_frame("2", "two")),
    ])]);
    let shutdown = Shutdown::new();
    let (mut rx, _handle) = StreamIngestor::new(connector).spawn(shutdown.listener(), 8);

    let mut labels = Vec::new();
    for _ in 0..4 {
        labels.push(label(&rx.recv().await.unwrap()));
    }
    assert_eq!(labels, ["connected:backend-1", "post:1", "error", "post:2"]);
    shutdown.trigger();
}

#[tokio::test]
async fn test_malformed_envelope_ends_session() {
    let (connector, tracker) = ScriptedConnector::new(vec![Attempt::Accept(vec![Step::Frame(
        "garbage".into(),
    )])]);
    let shutdown = Shutdown::new();
    let (mut rx, _handle) = StreamIngestor::new(connector).spawn(shutdown.listener(), 8);

    assert_eq!(label(&rx.recv().await.unwrap()), "connected:backend-1");
    match rx.recv().await.unwrap() {
        StreamStatus::Disconnected { error } => assert!(matches!(error, StreamError::Frame(_))),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(tracker.closed.load(Ordering::SeqCst), 1);
    shutdown.trigger();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff_stops_promptly() {
    let (connector, _tracker) = ScriptedConnector::new(vec![Attempt::Refuse]);
    let shutdown = Shutdown::new();
    let (mut rx, handle) = StreamIngestor::new(connector).spawn(shutdown.listener(), 8);

    assert_eq!(label(&rx.recv().await.unwrap()), "error");
    assert_eq!(label(&rx.recv().await.unwrap()), "reconnecting:5");

    let started = Instant::now();
    shutdown.trigger();
    assert!(rx.recv().await.is_none());
    handle.await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_cancel_during_read_closes_connection_before_channel() {
    let (connector, tracker) = ScriptedConnector::new(vec![Attempt::Accept(vec![])]);
    let shutdown = Shutdown::new();
    let (mut rx, handle) = StreamIngestor::new(connector).spawn(shutdown.listener(), 8);

    assert_eq!(label(&rx.recv().await.unwrap()), "connected:backend-1");
    shutdown.trigger();

    assert!(rx.recv().await.is_none());
    assert_eq!(tracker.closed.load(Ordering::SeqCst), 1);
    handle.await.unwrap();
}

#[tokio::test]
async fn test_dropped_receiver_stops_ingestor() {
    let (connector, tracker) = ScriptedConnector::new(vec![Attempt::Accept(vec![Step::Frame(
        update_frame("1", "x"),
    )])]);
    let shutdown = Shutdown::new();
    let (rx, handle) = StreamIngestor::new(connector).spawn(shutdown.listener(), 1);
    drop(rx);

    handle.await.unwrap();
    assert_eq!(tracker.closed.load(Ordering::SeqCst), 1);
}
