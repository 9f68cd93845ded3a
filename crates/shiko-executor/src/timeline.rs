//! Timeline API client
//!
//! The three calls the executors need:
//! - post a status (optionally as a reply)
//! - read the bot's own account
//! - change the bot's display name

use crate::error::TimelineError;
use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use shiko_core::{Account, Visibility};
use std::time::Duration;

/// Default request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A status to post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewStatus {
    /// Text
    pub status: String,
    /// Status being replied to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to_id: Option<String>,
    /// Visibility
    pub visibility: Visibility,
}

impl NewStatus {
    /// A reply to another status
    pub fn reply(in_reply_to_id: impl Into<String>, status: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            status: status.into(),
            in_reply_to_id: Some(in_reply_to_id.into()),
            visibility,
        }
    }

    /// A top-level status
    pub fn new(status: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            status: status.into(),
            in_reply_to_id: None,
            visibility,
        }
    }

    /// Key that lets the server drop a repeated post
    #[must_use]
    pub fn idempotency_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.in_reply_to_id.as_deref().unwrap_or_default().as_bytes());
        hasher.update([0]);
        hasher.update(self.status.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Timeline operations used by executors
#[async_trait]
pub trait Timeline: Send + Sync {
    /// Post a status and return its ID
    async fn post_status(&self, status: &NewStatus) -> Result<String, TimelineError>;

    /// The authenticated account
    async fn verify_credentials(&self) -> Result<Account, TimelineError>;

    /// Change the authenticated account's display name
    async fn update_display_name(&self, display_name: &str) -> Result<Account, TimelineError>;
}

/// Mastodon REST client
#[derive(Debug, Clone)]
pub struct MastodonClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

#[derive(Debug, serde::Deserialize)]
struct CreatedStatus {
    id: String,
}

impl MastodonClient {
    /// Create a client for the given server
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(base_url: &str, access_token: impl Into<String>) -> Result<Self, TimelineError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .user_agent(concat!("shiko/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn check(path: &str, response: reqwest::Response) -> Result<reqwest::Response, TimelineError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TimelineError::Status {
            endpoint: path.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Timeline for MastodonClient {
    async fn post_status(&self, status: &NewStatus) -> Result<String, TimelineError> {
        const PATH: &str = "/api/v1/statuses";
        let response = self
            .http
            .post(self.url(PATH))
            .bearer_auth(&self.access_token)
            .header("Idempotency-Key", status.idempotency_key())
            .json(status)
            .send()
            .await?;
        let created: CreatedStatus = Self::check(PATH, response).await?.json().await?;
        tracing::debug!(id = %created.id, "status posted");
        Ok(created.id)
    }

    async fn verify_credentials(&self) -> Result<Account, TimelineError> {
        const PATH: &str = "/api/v1/accounts/verify_credentials";
        let response = self
            .http
            .get(self.url(PATH))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        Ok(Self::check(PATH, response).await?.json().await?)
    }

    async fn update_display_name(&self, display_name: &str) -> Result<Account, TimelineError> {
        const PATH: &str = "/api/v1/accounts/update_credentials";
        let response = self
            .http
            .patch(self.url(PATH))
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "display_name": display_name }))
            .send()
            .await?;
        Ok(Self::check(PATH, response).await?.json().await?)
    }
}
