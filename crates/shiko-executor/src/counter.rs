//! Day rollover and counter bumps
//!
//! The running tally lives in the bot's display name as
//! `name（昨日: Y / 今日: T）`; the store keeps the per-day history.

use crate::error::ExecutorError;
use crate::store::CounterStore;
use crate::timeline::{NewStatus, Timeline};
use crate::Executor;
use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use shiko_core::{IncrementEvent, UpdateEvent, Visibility};
use std::sync::Arc;

static DISPLAY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.*)（昨日: (\d+) / 今日: (\d+)）").expect("display name pattern"));

/// Tally parsed from a display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Name without the tally suffix
    pub name: String,
    /// Count for the previous day
    pub yesterday: u32,
    /// Count so far today
    pub today: u32,
}

impl Summary {
    /// Parse a display name; names without a tally count as zero
    #[must_use]
    pub fn parse(display_name: &str) -> Self {
        let parsed = DISPLAY_NAME.captures(display_name).and_then(|caps| {
            let name = caps.get(1)?.as_str();
            if name.is_empty() {
                return None;
            }
            Some(Self {
                name: name.to_string(),
                yesterday: caps[2].parse().unwrap_or_default(),
                today: caps[3].parse().unwrap_or_default(),
            })
        });
        parsed.unwrap_or_else(|| Self {
            name: display_name.to_string(),
            yesterday: 0,
            today: 0,
        })
    }

    /// Display name carrying the given tally
    #[must_use]
    pub fn display_name(&self, yesterday: u32, today: u32) -> String {
        format!("{}（昨日: {yesterday} / 今日: {today}）", self.name)
    }

    /// Private status summarizing `date`, the day that just ended
    #[must_use]
    pub fn message(&self, date: NaiveDate) -> String {
        let particle = if self.yesterday == self.today { "も" } else { "は" };
        let status = format!("{} {particle}", date.format("%Y-%m-%d"));
        if self.today > 0 {
            format!("{status} {} 回ぴゅっぴゅしました…", self.today)
        } else {
            format!("{status}ぴゅっぴゅしませんでした…")
        }
    }
}

/// Closes the previous day when a new one starts
pub struct UpdateExecutor<T, S> {
    timeline: Arc<T>,
    store: Arc<S>,
    user_id: String,
}

impl<T: Timeline, S: CounterStore> UpdateExecutor<T, S> {
    pub fn new(timeline: Arc<T>, store: Arc<S>, user_id: impl Into<String>) -> Self {
        Self {
            timeline,
            store,
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl<T: Timeline, S: CounterStore> Executor<UpdateEvent> for UpdateExecutor<T, S> {
    fn name(&self) -> &'static str {
        "update"
    }

    async fn execute(&self, event: &UpdateEvent) -> Result<(), ExecutorError> {
        let yesterday = event
            .date
            .pred_opt()
            .ok_or_else(|| ExecutorError::InvalidDate(event.date.to_string()))?;

        let account = self.timeline.verify_credentials().await?;
        let summary = Summary::parse(&account.display_name);

        self.timeline
            .update_display_name(&summary.display_name(summary.today, 0))
            .await?;
        self.timeline
            .post_status(&NewStatus::new(summary.message(yesterday), Visibility::Private))
            .await?;
        self.store
            .update_count(&self.user_id, yesterday, summary.today)
            .await?;

        tracing::info!(date = %yesterday, count = summary.today, "day closed");
        Ok(())
    }
}

/// Bumps today's count
pub struct IncrementExecutor<T, S> {
    timeline: Arc<T>,
    store: Arc<S>,
}

impl<T: Timeline, S: CounterStore> IncrementExecutor<T, S> {
    pub fn new(timeline: Arc<T>, store: Arc<S>) -> Self {
        Self { timeline, store }
    }
}

#[async_trait]
impl<T: Timeline, S: CounterStore> Executor<IncrementEvent> for IncrementExecutor<T, S> {
    fn name(&self) -> &'static str {
        "increment"
    }

    async fn execute(&self, event: &IncrementEvent) -> Result<(), ExecutorError> {
        let account = self.timeline.verify_credentials().await?;
        let summary = Summary::parse(&account.display_name);
        let today = summary.today.saturating_add(1);

        self.timeline
            .update_display_name(&summary.display_name(summary.yesterday, today))
            .await?;
        self.store.update_count(&event.user, event.date, today).await?;

        tracing::info!(user = %event.user, date = %event.date, count = today, "count bumped");
        Ok(())
    }
}
