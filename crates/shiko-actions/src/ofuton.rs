use crate::random::{Random, ThreadRandom};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use shiko_core::{Action, ActionError, Post, Produced, ReplyEvent};
use std::sync::Arc;

/// Hashtag appended to every challenge reply
pub const CHALLENGE_TAG: &str = "おふとんチャレンジ";

const ALPHABET: [&str; 4] = ["お", "ふ", "と", "ん"];
const DRAWS: usize = 4;

static PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("ふとん[チﾁ][ャｬ][レﾚ][ンﾝ](ジ|ｼﾞ)").expect("challenge pattern"));

/// Answers a futon challenge with four random kana
pub struct OfutonAction {
    own_account_id: String,
    random: Arc<dyn Random>,
}

impl OfutonAction {
    /// Trigger that ignores replies posted by `own_account_id`
    pub fn new(own_account_id: impl Into<String>) -> Self {
        Self::with_random(own_account_id, Arc::new(ThreadRandom))
    }

    pub fn with_random(own_account_id: impl Into<String>, random: Arc<dyn Random>) -> Self {
        Self {
            own_account_id: own_account_id.into(),
            random,
        }
    }

    fn draw(&self) -> String {
        let mut body: String = (0..DRAWS)
            .map(|_| ALPHABET[self.random.index(ALPHABET.len())])
            .collect();
        body.push_str("\n#");
        body.push_str(CHALLENGE_TAG);
        body
    }
}

#[async_trait]
impl Action for OfutonAction {
    fn name(&self) -> &str {
        CHALLENGE_TAG
    }

    fn target(&self, post: &Post) -> bool {
        if post.is_reblog || post.has_tag(CHALLENGE_TAG) {
            return false;
        }
        if post.account.id == self.own_account_id && post.is_reply() {
            return false;
        }
        PATTERN.is_match(&post.content)
    }

    async fn produce(&self, post: &Post) -> Result<Produced, ActionError> {
        let found = PATTERN
            .find(&post.content)
            .ok_or_else(|| ActionError::PatternNotFound {
                post_id: post.id.clone(),
            })?;

        let reply = ReplyEvent {
            in_reply_to: post.id.clone(),
            acct: post.account.acct.clone(),
            body: self.draw(),
            visibility: post.visibility,
        };
        tracing::trace!(post_id = %post.id, offset = found.start(), "futon challenge drawn");
        Ok(Produced::new(reply, found.start()))
    }
}
