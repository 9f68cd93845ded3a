use crate::error::ExecutorError;
use crate::timeline::{NewStatus, Timeline};
use crate::Executor;
use async_trait::async_trait;
use shiko_core::{Packer, ReplyEvent};
use std::sync::Arc;

/// Posts trigger replies, packed to the status length budget
pub struct ReplyExecutor<T> {
    timeline: Arc<T>,
    packer: Packer,
}

impl<T: Timeline> ReplyExecutor<T> {
    pub fn new(timeline: Arc<T>) -> Self {
        Self {
            timeline,
            packer: Packer::default(),
        }
    }
}

#[async_trait]
impl<T: Timeline> Executor<ReplyEvent> for ReplyExecutor<T> {
    fn name(&self) -> &'static str {
        "reply"
    }

    async fn execute(&self, event: &ReplyEvent) -> Result<(), ExecutorError> {
        let prefix = format!("@{} ", event.acct);
        let text = self.packer.pack(&prefix, event.body.as_bytes()).await?;

        let id = self
            .timeline
            .post_status(&NewStatus::reply(&event.in_reply_to, text, event.visibility))
            .await?;
        tracing::info!(in_reply_to = %event.in_reply_to, id = %id, "replied");
        Ok(())
    }
}
