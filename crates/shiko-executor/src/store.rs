//! Counter store
//!
//! Daily counts keyed by user and calendar day, plus a raw query entry
//! point for administrative commands.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS "counts" (
    "user_id" TEXT NOT NULL,
    "date" TEXT NOT NULL,
    "count" INTEGER NOT NULL,
    PRIMARY KEY ("user_id", "date")
);
"#;

/// Outcome of a raw query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    /// Column names, empty for statements that return no rows
    pub columns: Vec<String>,
    /// Values rendered as text, one vector per row
    pub rows: Vec<Vec<String>>,
    /// Rows returned, or rows changed for statements without a result set
    pub affected: usize,
}

impl QueryResult {
    /// Render each row as `column: value` lines
    #[must_use]
    pub fn rendered_rows(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| format!("{column}: {value}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect()
    }
}

/// Persistence used by executors
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Set the count of `user` on `date`
    async fn update_count(&self, user: &str, date: NaiveDate, count: u32) -> Result<(), StoreError>;

    /// Run an arbitrary statement
    async fn query(&self, sql: &str) -> Result<QueryResult, StoreError>;
}

/// SQLite-backed counter store
#[derive(Debug, Clone)]
pub struct SqliteCounterStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCounterStore {
    /// Open (or create) a database file
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened or the schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?)
    }

    /// In-memory database
    ///
    /// # Errors
    ///
    /// Fails when the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || f(&mut conn.lock()))
            .await
            .map_err(|e| StoreError::Worker(e.to_string()))?
    }
}

#[async_trait]
impl CounterStore for SqliteCounterStore {
    async fn update_count(&self, user: &str, date: NaiveDate, count: u32) -> Result<(), StoreError> {
        let user = user.to_string();
        let date = date.format("%Y-%m-%d").to_string();
        self.blocking(move |conn| {
            conn.execute(
                r#"INSERT INTO "counts" ("user_id", "date", "count") VALUES (?1, ?2, ?3)
                   ON CONFLICT ("user_id", "date") DO UPDATE SET "count" = excluded."count""#,
                params![user, date, count],
            )?;
            Ok(())
        })
        .await
    }

    async fn query(&self, sql: &str) -> Result<QueryResult, StoreError> {
        let sql = sql.to_string();
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            if stmt.column_count() == 0 {
                let affected = stmt.execute([])?;
                return Ok(QueryResult {
                    affected,
                    ..QueryResult::default()
                });
            }

            let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
            let width = columns.len();
            let mut rows = Vec::new();
            let mut cursor = stmt.query([])?;
            while let Some(row) = cursor.next()? {
                let mut values = Vec::with_capacity(width);
                for i in 0..width {
                    values.push(render(row.get_ref(i)?));
                }
                rows.push(values);
            }
            Ok(QueryResult {
                affected: rows.len(),
                columns,
                rows,
            })
        })
        .await
    }
}

fn render(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
