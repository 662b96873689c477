//! Legacy single-tenant engine: one SQLite file, integer ids, no tenant column.

use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

use super::backend::{is_insert, Backend, BackendKind, RunResult};
use super::error::DatabaseError;
use super::value::{RecordId, Row, SqlValue};
use crate::config::DatabaseConfig;

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>;

const MEMORY_PATH: &str = ":memory:";

pub struct LegacyBackend {
    pool: SqlitePool,
    path: String,
    /// SQLite allows one writer at a time; writes queue here instead of
    /// racing for the file lock.
    write_gate: Mutex<()>,
}

impl std::fmt::Debug for LegacyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyBackend")
            .field("path", &self.path)
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

impl LegacyBackend {
    /// Open (creating if needed) the database file named in the config.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let path = config.legacy_path.trim();
        if path.is_empty() {
            return Err(DatabaseError::ConfigMissing("LEGACY_DATABASE_PATH"));
        }
        if path == MEMORY_PATH {
            return Self::in_memory().await;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_with(options)
            .await?;

        info!("Opened legacy database: {}", path);
        Ok(Self { pool, path: path.to_string(), write_gate: Mutex::new(()) })
    }

    /// A private in-memory database. Every pooled connection would see its own
    /// empty database, so the pool is pinned to a single long-lived connection.
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self { pool, path: MEMORY_PATH.to_string(), write_gate: Mutex::new(()) })
    }
}

#[async_trait]
impl Backend for LegacyBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Legacy
    }

    async fn get(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, DatabaseError> {
        let row = bind_all(sqlx::query(sql), params).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_json).transpose()
    }

    async fn all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DatabaseError> {
        let rows = bind_all(sqlx::query(sql), params).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_json).collect()
    }

    async fn run(&self, sql: &str, params: &[SqlValue]) -> Result<RunResult, DatabaseError> {
        let _writer = self.write_gate.lock().await;
        let result = bind_all(sqlx::query(sql), params).execute(&self.pool).await?;
        let id = is_insert(sql).then(|| RecordId::Int(result.last_insert_rowid()));
        Ok(RunResult { id, changes: result.rows_affected() })
    }

    async fn test_connection(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Legacy database health probe failed: {}", e);
                false
            }
        }
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed legacy database: {}", self.path);
    }
}

fn bind_all<'q>(mut q: SqliteQuery<'q>, params: &[SqlValue]) -> SqliteQuery<'q> {
    for p in params {
        q = bind_param(q, p);
    }
    q
}

fn bind_param<'q>(q: SqliteQuery<'q>, v: &SqlValue) -> SqliteQuery<'q> {
    match v {
        SqlValue::Null(_) => q.bind(None::<String>),
        SqlValue::Bool(b) => q.bind(*b),
        SqlValue::Int(i) => q.bind(*i),
        SqlValue::Float(f) => q.bind(*f),
        SqlValue::Text(s) => q.bind(s.clone()),
        // No UUID columns exist in the legacy schema; store the text form.
        SqlValue::Uuid(u) => q.bind(u.to_string()),
    }
}

/// SQLite is dynamically typed: decode by the value's storage class, except
/// for columns declared BOOLEAN which come back as 0/1 integers.
fn row_to_json(row: &SqliteRow) -> Result<Row, DatabaseError> {
    let mut map = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            Value::Null
        } else if column.type_info().name().eq_ignore_ascii_case("BOOLEAN") {
            Value::Bool(row.try_get::<bool, _>(i)?)
        } else {
            match raw.type_info().name() {
                "INTEGER" => Value::from(row.try_get::<i64, _>(i)?),
                // NaN and infinities have no JSON form.
                "REAL" => Number::from_f64(row.try_get::<f64, _>(i)?)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "BLOB" => Value::String(String::from_utf8_lossy(&row.try_get::<Vec<u8>, _>(i)?).into_owned()),
                _ => Value::String(row.try_get::<String, _>(i)?),
            }
        };
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_returns_rowid_and_rows_decode() {
        let db = LegacyBackend::in_memory().await.unwrap();
        db.run(
            "CREATE TABLE things (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, weight REAL, flag BOOLEAN)",
            &[],
        )
        .await
        .unwrap();

        let first = db
            .run(
                "INSERT INTO things (name, weight, flag) VALUES (?, ?, ?)",
                &[SqlValue::text("a"), SqlValue::Float(1.5), SqlValue::Bool(true)],
            )
            .await
            .unwrap();
        assert_eq!(first.id, Some(RecordId::Int(1)));
        assert_eq!(first.changes, 1);

        let row = db
            .get("SELECT * FROM things WHERE id = ?", &[SqlValue::Int(1)])
            .await
            .unwrap()
            .expect("row");
        assert_eq!(row["name"], "a");
        assert_eq!(row["weight"], 1.5);
        assert_eq!(row["flag"], true);
    }

    #[tokio::test]
    async fn updates_report_changes_without_id() {
        let db = LegacyBackend::in_memory().await.unwrap();
        db.run("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)", &[]).await.unwrap();
        db.run("INSERT INTO t (v) VALUES (?)", &[SqlValue::text("x")]).await.unwrap();

        let res = db
            .run("UPDATE t SET v = ? WHERE id = ?", &[SqlValue::text("y"), SqlValue::Int(99)])
            .await
            .unwrap();
        assert_eq!(res, RunResult { id: None, changes: 0 });
    }

    #[tokio::test]
    async fn undecodable_values_are_errors() {
        let db = LegacyBackend::in_memory().await.unwrap();
        db.run("CREATE TABLE t (id INTEGER PRIMARY KEY, flag BOOLEAN)", &[]).await.unwrap();
        db.run("INSERT INTO t (flag) VALUES (?)", &[SqlValue::text("maybe")]).await.unwrap();

        assert!(db.all("SELECT * FROM t", &[]).await.is_err());
        assert!(db.get("SELECT * FROM t", &[]).await.is_err());
    }

    #[tokio::test]
    async fn probe_reports_health() {
        let db = LegacyBackend::in_memory().await.unwrap();
        assert!(db.test_connection().await);
        db.close().await;
        assert!(!db.test_connection().await);
    }
}
