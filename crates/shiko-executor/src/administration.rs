use crate::error::ExecutorError;
use crate::store::{CounterStore, QueryResult};
use crate::timeline::{NewStatus, Timeline};
use crate::Executor;
use async_trait::async_trait;
use shiko_core::{AdministrationEvent, Packer};
use std::sync::Arc;

const SEPARATOR: &str = "\n--------\n";

/// Runs owner-issued queries and replies with the result
pub struct AdministrationExecutor<T, S> {
    timeline: Arc<T>,
    store: Arc<S>,
    packer: Packer,
}

impl<T: Timeline, S: CounterStore> AdministrationExecutor<T, S> {
    pub fn new(timeline: Arc<T>, store: Arc<S>) -> Self {
        Self {
            timeline,
            store,
            packer: Packer::default(),
        }
    }
}

/// Reply body for a query result
#[must_use]
pub fn format_result(acct: &str, result: &QueryResult) -> String {
    let mut text = format!("@{acct}\n");
    for row in result.rendered_rows() {
        text.push_str(&row);
        text.push_str(SEPARATOR);
    }
    let unit = if result.affected == 1 { "row" } else { "rows" };
    text.push_str(&format!("({} {unit})", result.affected));
    text
}

#[async_trait]
impl<T: Timeline, S: CounterStore> Executor<AdministrationEvent> for AdministrationExecutor<T, S> {
    fn name(&self) -> &'static str {
        "administration"
    }

    async fn execute(&self, event: &AdministrationEvent) -> Result<(), ExecutorError> {
        if event.kind != AdministrationEvent::DB {
            return Err(ExecutorError::UnsupportedCommand(event.kind.clone()));
        }

        let result = self.store.query(&event.command).await?;
        let body = format_result(&event.acct, &result);
        let text = self.packer.pack("", body.as_bytes()).await?;

        self.timeline
            .post_status(&NewStatus::reply(&event.in_reply_to, text, event.visibility))
            .await?;
        tracing::info!(affected = result.affected, "administration command answered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_rows_and_count() {
        let result = QueryResult {
            columns: vec!["date".into(), "count".into()],
            rows: vec![
                vec!["2024-05-01".into(), "3".into()],
                vec!["2024-05-02".into(), "0".into()],
            ],
            affected: 2,
        };
        assert_eq!(
            format_result("shiko", &result),
            "@shiko\ndate: 2024-05-01\ncount: 3\n--------\ndate: 2024-05-02\ncount: 0\n--------\n(2 rows)"
        );
    }

    #[test]
    fn singular_row() {
        let result = QueryResult {
            affected: 1,
            ..QueryResult::default()
        };
        assert_eq!(format_result("a", &result), "@a\n(1 row)");
    }
}
