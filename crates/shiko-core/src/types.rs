//! Timeline data model
//!
//! A [`Post`] is an immutable snapshot of one timeline update as the
//! stream delivered it. Content is plain text: markup has already been
//! stripped and entities unescaped by the time a `Post` exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who can see a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible to everyone, shown on public timelines
    #[default]
    Public,
    /// Visible to everyone, hidden from public timelines
    Unlisted,
    /// Followers only
    Private,
    /// Mentioned accounts only
    Direct,
}

impl Visibility {
    /// Wire name used by the timeline API
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
            Self::Private => "private",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author of a post
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Account {
    /// Server-assigned account ID
    pub id: String,
    /// Handle, `user` for local accounts and `user@domain` for remote ones
    pub acct: String,
    /// Display name as shown on the profile
    pub display_name: String,
    /// Local username
    pub username: String,
}

impl Account {
    /// Create an account with matching handle and username
    pub fn new(id: impl Into<String>, acct: impl Into<String>) -> Self {
        let acct = acct.into();
        let username = acct.split('@').next().unwrap_or_default().to_string();
        Self {
            id: id.into(),
            display_name: username.clone(),
            acct,
            username,
        }
    }

    /// Set the display name
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// One timeline update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Status ID
    pub id: String,
    /// Author
    pub account: Account,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Plain-text content
    pub content: String,
    /// Custom emoji shortcodes used in the content
    pub emojis: Vec<String>,
    /// Hashtag names, without the leading `#`
    pub tags: Vec<String>,
    /// ID of the status this one replies to
    pub in_reply_to_id: Option<String>,
    /// Whether this update is a reshare of another status
    pub is_reblog: bool,
    /// Visibility
    pub visibility: Visibility,
}

impl Post {
    /// Create a public, non-reply post created now
    pub fn new(id: impl Into<String>, account: Account, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            account,
            created_at: Utc::now(),
            content: content.into(),
            emojis: Vec::new(),
            tags: Vec::new(),
            in_reply_to_id: None,
            is_reblog: false,
            visibility: Visibility::Public,
        }
    }

    /// Set the creation time
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Add a hashtag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add a custom emoji shortcode
    #[must_use]
    pub fn with_emoji(mut self, shortcode: impl Into<String>) -> Self {
        self.emojis.push(shortcode.into());
        self
    }

    /// Mark as a reply to another status
    #[must_use]
    pub fn in_reply_to(mut self, id: impl Into<String>) -> Self {
        self.in_reply_to_id = Some(id.into());
        self
    }

    /// Mark as a reshare
    #[must_use]
    pub fn reblogged(mut self) -> Self {
        self.is_reblog = true;
        self
    }

    /// Set the visibility
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Whether the post carries the given hashtag (case-insensitive)
    #[must_use]
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.to_lowercase() == name.to_lowercase())
    }

    /// Whether the post is a reply
    #[inline]
    #[must_use]
    pub fn is_reply(&self) -> bool {
        self.in_reply_to_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}
