//! WebSocket connector for the Mastodon streaming API
//!
//! Builds `ws(s)://<server>/api/v1/streaming?access_token=..&stream=..`
//! from the server's HTTP URL and speaks text frames over tungstenite.

use crate::error::StreamError;
use crate::ingestor::{Connector, FrameSource, Session};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::borrow::Cow;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

/// Response header naming the backend that accepted the connection
pub const SERVER_HEADER: &str = "X-Served-By";

/// Default handshake timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Derive the streaming endpoint from a server URL
///
/// # Errors
///
/// Returns [`StreamError::InvalidUrl`] when the URL does not parse or uses
/// a scheme other than `http(s)` or `ws(s)`.
pub fn streaming_url(server_url: &str, access_token: &str, stream: &str) -> Result<Url, StreamError> {
    let mut url = Url::parse(server_url).map_err(|e| StreamError::InvalidUrl(format!("{server_url}: {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(StreamError::InvalidUrl(format!("unsupported scheme {other}"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| StreamError::InvalidUrl(format!("cannot use scheme {scheme}")))?;

    let base = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{base}/api/v1/streaming"));
    url.query_pairs_mut()
        .clear()
        .append_pair("access_token", access_token)
        .append_pair("stream", stream);
    Ok(url)
}

/// Opens streaming sessions over WebSocket
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: Url,
    connect_timeout: Duration,
}

impl WebSocketConnector {
    /// Create a connector for the given server
    ///
    /// # Errors
    ///
    /// See [`streaming_url`].
    pub fn new(server_url: &str, access_token: &str, stream: &str) -> Result<Self, StreamError> {
        Ok(Self {
            url: streaming_url(server_url, access_token, stream)?,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    /// Set the handshake timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Endpoint without the query string, safe to log
    #[must_use]
    pub fn endpoint(&self) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        url.to_string()
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Frames = WebSocketFrames;

    async fn connect(&self) -> Result<Session<WebSocketFrames>, StreamError> {
        let (ws, response) = timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| StreamError::ConnectTimeout {
                secs: self.connect_timeout.as_secs(),
            })?
            .map_err(|e| match e {
                tungstenite::Error::Http(response) => {
                    StreamError::Connect(format!("{}: {}", self.endpoint(), response.status()))
                }
                other => StreamError::Connect(format!("{}: {other}", self.endpoint())),
            })?;

        let server = response
            .headers()
            .get(SERVER_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Ok(Session {
            frames: WebSocketFrames { ws },
            server,
        })
    }
}

/// Frames of an open WebSocket session
pub struct WebSocketFrames {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameSource for WebSocketFrames {
    async fn next_frame(&mut self) -> Result<String, StreamError> {
        loop {
            let message = self
                .ws
                .next()
                .await
                .ok_or(StreamError::Closed)?
                .map_err(|e| StreamError::Transport(e.to_string()))?;

            match message {
                Message::Text(text) => return Ok(text),
                Message::Binary(bytes) => {
                    return String::from_utf8(bytes)
                        .map_err(|e| StreamError::Transport(format!("non-UTF-8 frame: {e}")));
                }
                Message::Close(_) => return Err(StreamError::Closed),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: Cow::Borrowed("Shutdown"),
        };
        match self.ws.close(Some(frame)).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(StreamError::Transport(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_becomes_wss_with_streaming_path() {
        let url = streaming_url("https://example.com", "tok", "user").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://example.com/api/v1/streaming?access_token=tok&stream=user"
        );
    }

    #[test]
    fn keeps_base_path() {
        let url = streaming_url("http://example.com/social/", "t", "public:local").unwrap();
        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.path(), "/social/api/v1/streaming");
    }

    #[test]
    fn rejects_unparseable_url() {
        assert!(matches!(
            streaming_url("not a url", "t", "user"),
            Err(StreamError::InvalidUrl(_))
        ));
        assert!(streaming_url("ftp://example.com", "t", "user").is_err());
    }

    #[test]
    fn endpoint_hides_token() {
        let connector = WebSocketConnector::new("https://example.com", "secret", "user").unwrap();
        assert!(!connector.endpoint().contains("secret"));
    }
}
