//! Streaming frame decoding
//!
//! Frames are JSON envelopes `{"event": kind, "payload": string}` where the
//! payload is itself JSON text:
//! - `update` carries a status
//! - `conversation` carries a conversation whose `last_status` is used
//! - every other kind is ignored

use crate::error::FrameError;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use shiko_core::{Account, Post, Visibility};

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    id: String,
    acct: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    username: String,
}

#[derive(Debug, Deserialize)]
struct RawEmoji {
    shortcode: String,
}

#[derive(Debug, Deserialize)]
struct RawTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    id: String,
    account: RawAccount,
    created_at: DateTime<Utc>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    emojis: Vec<RawEmoji>,
    #[serde(default)]
    tags: Vec<RawTag>,
    #[serde(default)]
    in_reply_to_id: Option<String>,
    #[serde(default)]
    reblog: Option<serde_json::Value>,
    #[serde(default)]
    visibility: Visibility,
}

#[derive(Debug, Deserialize)]
struct RawConversation {
    #[serde(default)]
    last_status: Option<RawStatus>,
}

impl From<RawStatus> for Post {
    fn from(raw: RawStatus) -> Self {
        Post {
            id: raw.id,
            account: Account {
                id: raw.account.id,
                acct: raw.account.acct,
                display_name: raw.account.display_name,
                username: raw.account.username,
            },
            created_at: raw.created_at,
            content: html_to_text(&raw.content),
            emojis: raw.emojis.into_iter().map(|e| e.shortcode).collect(),
            tags: raw.tags.into_iter().map(|t| t.name).collect(),
            in_reply_to_id: raw.in_reply_to_id.filter(|id| !id.is_empty()),
            is_reblog: raw.reblog.is_some_and(|r| !r.is_null()),
            visibility: raw.visibility,
        }
    }
}

/// Decode one text frame
///
/// Returns `Ok(None)` for frames that carry no post.
///
/// # Errors
///
/// [`FrameError::Envelope`] when the frame itself is not valid; the other
/// variants when only the payload of a known kind is bad.
pub fn decode_frame(text: &str) -> Result<Option<Post>, FrameError> {
    let envelope: Envelope = serde_json::from_str(text).map_err(FrameError::Envelope)?;

    match envelope.event.as_str() {
        "update" => {
            let payload = payload_text(&envelope)?;
            let status: RawStatus =
                serde_json::from_str(payload).map_err(|source| FrameError::Payload {
                    event: envelope.event.clone(),
                    source,
                })?;
            Ok(Some(status.into()))
        }
        "conversation" => {
            let payload = payload_text(&envelope)?;
            let conversation: RawConversation =
                serde_json::from_str(payload).map_err(|source| FrameError::Payload {
                    event: envelope.event.clone(),
                    source,
                })?;
            Ok(conversation.last_status.map(Post::from))
        }
        _ => Ok(None),
    }
}

fn payload_text(envelope: &Envelope) -> Result<&str, FrameError> {
    envelope
        .payload
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| FrameError::MissingPayload {
            event: envelope.event.clone(),
        })
}

/// Strip markup and unescape character references
#[must_use]
pub fn html_to_text(html: &str) -> String {
    html_escape::decode_html_entities(&TAG.replace_all(html, "")).into_owned()
}
