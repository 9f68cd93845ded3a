//! Executors against a mocked timeline and an in-memory store

use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::{mock, Sequence};
use shiko_core::{
    perceived_len, Account, AdministrationEvent, IncrementEvent, ReplyEvent, UpdateEvent,
    Visibility,
};
use shiko_executor::{
    AdministrationExecutor, CounterStore, Executor, ExecutorError, IncrementExecutor, NewStatus,
    ReplyExecutor, SqliteCounterStore, Timeline, TimelineError, UpdateExecutor,
};
use std::sync::Arc;

mock! {
    pub Api {}

    #[async_trait]
    impl Timeline for Api {
        async fn post_status(&self, status: &NewStatus) -> Result<String, TimelineError>;
        async fn verify_credentials(&self) -> Result<Account, TimelineError>;
        async fn update_display_name(&self, display_name: &str) -> Result<Account, TimelineError>;
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

fn bot(display_name: &str) -> Account {
    Account::new("1", "shiko").with_display_name(display_name)
}

async fn counts(store: &SqliteCounterStore) -> Vec<Vec<String>> {
    store
        .query(r#"SELECT "user_id", "date", "count" FROM "counts" ORDER BY "date""#)
        .await
        .unwrap()
        .rows
}

#[tokio::test]
async fn reply_is_prefixed_and_threaded() {
    let mut api = MockApi::new();
    api.expect_post_status()
        .withf(|s| {
            s.status == "@alice@example.com とおふお"
                && s.in_reply_to_id.as_deref() == Some("100")
                && s.visibility == Visibility::Unlisted
        })
        .times(1)
        .returning(|_| Ok("200".into()));

    let executor = ReplyExecutor::new(Arc::new(api));
    let event = ReplyEvent {
        in_reply_to: "100".into(),
        acct: "alice@example.com".into(),
        body: "とおふお".into(),
        visibility: Visibility::Unlisted,
    };
    executor.execute(&event).await.unwrap();
}

#[tokio::test]
async fn long_reply_is_cut_to_budget() {
    let mut api = MockApi::new();
    api.expect_post_status()
        .withf(|s| {
            s.status.starts_with("@alice@example.com aaa")
                && perceived_len(&s.status) <= 500
                && perceived_len(&s.status) > 490
        })
        .times(1)
        .returning(|_| Ok("200".into()));

    let executor = ReplyExecutor::new(Arc::new(api));
    let event = ReplyEvent {
        in_reply_to: "100".into(),
        acct: "alice@example.com".into(),
        body: "a".repeat(600),
        visibility: Visibility::Public,
    };
    executor.execute(&event).await.unwrap();
}

#[tokio::test]
async fn reply_failure_surfaces() {
    let mut api = MockApi::new();
    api.expect_post_status().times(1).returning(|_| {
        Err(TimelineError::Status {
            endpoint: "/api/v1/statuses".into(),
            status: 503,
            body: String::new(),
        })
    });

    let executor = ReplyExecutor::new(Arc::new(api));
    let event = ReplyEvent {
        in_reply_to: "100".into(),
        acct: "bob".into(),
        body: "x".into(),
        visibility: Visibility::Public,
    };
    let err = executor.execute(&event).await.unwrap_err();
    assert!(matches!(err, ExecutorError::Timeline(ref e) if e.is_retryable()));
}

#[tokio::test]
async fn update_closes_previous_day() {
    let mut seq = Sequence::new();
    let mut api = MockApi::new();
    api.expect_verify_credentials()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(bot("しこ（昨日: 1 / 今日: 3）")));
    api.expect_update_display_name()
        .withf(|name| name == "しこ（昨日: 3 / 今日: 0）")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|name| Ok(bot(name)));
    api.expect_post_status()
        .withf(|s| {
            s.status == "2024-05-01 は 3 回ぴゅっぴゅしました…"
                && s.in_reply_to_id.is_none()
                && s.visibility == Visibility::Private
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok("300".into()));

    let store = Arc::new(SqliteCounterStore::open_in_memory().unwrap());
    let executor = UpdateExecutor::new(Arc::new(api), Arc::clone(&store), "1");
    executor.execute(&UpdateEvent { date: day(2) }).await.unwrap();

    assert_eq!(counts(&store).await, [["1", "2024-05-01", "3"]]);
}

#[tokio::test]
async fn update_without_tally_reports_nothing() {
    let mut api = MockApi::new();
    api.expect_verify_credentials().returning(|| Ok(bot("しこ")));
    api.expect_update_display_name()
        .withf(|name| name == "しこ（昨日: 0 / 今日: 0）")
        .returning(|name| Ok(bot(name)));
    api.expect_post_status()
        .withf(|s| s.status == "2024-04-30 もぴゅっぴゅしませんでした…")
        .returning(|_| Ok("300".into()));

    let store = Arc::new(SqliteCounterStore::open_in_memory().unwrap());
    let executor = UpdateExecutor::new(Arc::new(api), Arc::clone(&store), "1");
    executor.execute(&UpdateEvent { date: day(1) }).await.unwrap();

    assert_eq!(counts(&store).await, [["1", "2024-04-30", "0"]]);
}

#[tokio::test]
async fn increment_bumps_today() {
    let mut api = MockApi::new();
    api.expect_verify_credentials()
        .times(1)
        .returning(|| Ok(bot("しこ（昨日: 2 / 今日: 4）")));
    api.expect_update_display_name()
        .withf(|name| name == "しこ（昨日: 2 / 今日: 5）")
        .times(1)
        .returning(|name| Ok(bot(name)));

    let store = Arc::new(SqliteCounterStore::open_in_memory().unwrap());
    let executor = IncrementExecutor::new(Arc::new(api), Arc::clone(&store));
    let event = IncrementEvent {
        user: "1".into(),
        date: day(3),
    };
    executor.execute(&event).await.unwrap();

    assert_eq!(counts(&store).await, [["1", "2024-05-03", "5"]]);
}

#[tokio::test]
async fn increment_stops_when_name_update_fails() {
    let mut api = MockApi::new();
    api.expect_verify_credentials().returning(|| Ok(bot("しこ")));
    api.expect_update_display_name().returning(|_| {
        Err(TimelineError::Status {
            endpoint: "/api/v1/accounts/update_credentials".into(),
            status: 422,
            body: "invalid".into(),
        })
    });

    let store = Arc::new(SqliteCounterStore::open_in_memory().unwrap());
    let executor = IncrementExecutor::new(Arc::new(api), Arc::clone(&store));
    let event = IncrementEvent {
        user: "1".into(),
        date: day(3),
    };
    assert!(executor.execute(&event).await.is_err());
    assert!(counts(&store).await.is_empty());
}

fn administration(kind: &str, command: &str) -> AdministrationEvent {
    AdministrationEvent {
        in_reply_to: "100".into(),
        acct: "shiko".into(),
        kind: kind.into(),
        command: command.into(),
        visibility: Visibility::Direct,
    }
}

#[tokio::test]
async fn administration_replies_with_rows() {
    let store = Arc::new(SqliteCounterStore::open_in_memory().unwrap());
    store.update_count("1", day(1), 3).await.unwrap();

    let mut api = MockApi::new();
    api.expect_post_status()
        .withf(|s| {
            s.status == "@shiko\ndate: 2024-05-01\ncount: 3\n--------\n(1 row)"
                && s.in_reply_to_id.as_deref() == Some("100")
                && s.visibility == Visibility::Direct
        })
        .times(1)
        .returning(|_| Ok("400".into()));

    let executor = AdministrationExecutor::new(Arc::new(api), store);
    executor
        .execute(&administration("DB", r#"SELECT "date", "count" FROM "counts""#))
        .await
        .unwrap();
}

#[tokio::test]
async fn administration_rejects_unknown_kind() {
    let store = Arc::new(SqliteCounterStore::open_in_memory().unwrap());
    let executor = AdministrationExecutor::new(Arc::new(MockApi::new()), store);

    let err = executor
        .execute(&administration("SHELL", "ls"))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutorError::UnsupportedCommand(kind) if kind == "SHELL"));
}

#[tokio::test]
async fn administration_bad_sql_posts_nothing() {
    let store = Arc::new(SqliteCounterStore::open_in_memory().unwrap());
    let executor = AdministrationExecutor::new(Arc::new(MockApi::new()), store);

    let err = executor
        .execute(&administration("DB", "SELEKT 1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutorError::Store(_)));
}

#[tokio::test]
async fn store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counts.db");
    {
        let store = SqliteCounterStore::open(&path).unwrap();
        store.update_count("1", day(1), 7).await.unwrap();
    }
    let store = SqliteCounterStore::open(&path).unwrap();
    assert_eq!(counts(&store).await, [["1", "2024-05-01", "7"]]);
}
