use async_trait::async_trait;
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use shiko_core::{Action, ActionError, IncrementEvent, MatchOffset, Post, Produced};

static PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new("^ぴゅっ♡+$").expect("counter pattern"));

/// Counts the owner's `ぴゅっ♡` posts
pub struct PyuUpdateAction {
    own_account_id: String,
}

impl PyuUpdateAction {
    pub fn new(own_account_id: impl Into<String>) -> Self {
        Self {
            own_account_id: own_account_id.into(),
        }
    }
}

#[async_trait]
impl Action for PyuUpdateAction {
    fn name(&self) -> &str {
        "ぴゅっ♡"
    }

    fn target(&self, post: &Post) -> bool {
        !post.is_reblog
            && post.account.id == self.own_account_id
            && PATTERN.is_match(&post.content)
    }

    async fn produce(&self, post: &Post) -> Result<Produced, ActionError> {
        // The count belongs to the day the post was written, in local time.
        let date = post.created_at.with_timezone(&Local).date_naive();
        let event = IncrementEvent {
            user: post.account.id.clone(),
            date,
        };
        Ok(Produced::new(event, MatchOffset::START))
    }
}
