use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use shiko_core::{Action, ActionError, AdministrationEvent, MatchOffset, Post, Produced};

static PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^SQL:\s?(.+)").expect("sql pattern"));

/// Turns the owner's `SQL: ...` posts into database commands
pub struct SqlAction {
    own_account_id: String,
}

impl SqlAction {
    pub fn new(own_account_id: impl Into<String>) -> Self {
        Self {
            own_account_id: own_account_id.into(),
        }
    }
}

#[async_trait]
impl Action for SqlAction {
    fn name(&self) -> &str {
        AdministrationEvent::DB
    }

    fn target(&self, post: &Post) -> bool {
        !post.is_reblog
            && post.account.id == self.own_account_id
            && PATTERN.is_match(&post.content)
    }

    async fn produce(&self, post: &Post) -> Result<Produced, ActionError> {
        let command = PATTERN
            .captures(&post.content)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| ActionError::PatternNotFound {
                post_id: post.id.clone(),
            })?;

        let event = AdministrationEvent {
            in_reply_to: post.id.clone(),
            acct: post.account.acct.clone(),
            kind: AdministrationEvent::DB.to_string(),
            command: command.as_str().to_string(),
            visibility: post.visibility,
        };
        Ok(Produced::new(event, MatchOffset::START))
    }
}
