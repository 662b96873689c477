//! Multi-tenant engine: pooled PostgreSQL, UUID ids, `tenant_id` on scoped tables.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Number, Value};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::backend::{is_insert, Backend, BackendKind, RunResult};
use super::error::DatabaseError;
use super::value::{RecordId, Row, SqlType, SqlValue};
use crate::config::DatabaseConfig;

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, PgArguments>;

#[derive(Debug)]
pub struct MultiTenantBackend {
    pool: PgPool,
    /// Connection URL with the password removed, for logs
    display_url: String,
}

impl MultiTenantBackend {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let display_url = redact_url(url)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool for: {}", display_url);
        Ok(Self { pool, display_url })
    }

    /// Wrap an existing pool (tests, tooling).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool, display_url: "<external pool>".to_string() }
    }
}

#[async_trait]
impl Backend for MultiTenantBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::MultiTenant
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
        if !is_insert(sql) {
            let result = bind_all(sqlx::query(sql), params).execute(&self.pool).await?;
            return Ok(RunResult { id: None, changes: result.rows_affected() });
        }

        let statement = with_returning_id(sql);
        let row = bind_all(sqlx::query(&statement), params)
            .fetch_optional(&self.pool)
            .await?;
        let id = match &row {
            Some(row) => returned_id(row)?,
            None => None,
        };
        Ok(RunResult { id, changes: u64::from(row.is_some()) })
    }

    async fn test_connection(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Database health probe failed for {}: {}", self.display_url, e);
                false
            }
        }
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool: {}", self.display_url);
    }
}

/// Ids are generated by the database; have the INSERT hand them back.
fn with_returning_id(sql: &str) -> String {
    let has_returning = sql
        .split_whitespace()
        .any(|word| word.eq_ignore_ascii_case("returning"));
    if has_returning {
        sql.to_string()
    } else {
        format!("{} RETURNING id", sql.trim_end().trim_end_matches(';').trim_end())
    }
}

fn returned_id(row: &PgRow) -> Result<Option<RecordId>, DatabaseError> {
    if let Ok(id) = row.try_get::<Option<Uuid>, _>("id") {
        return Ok(id.map(RecordId::Uuid));
    }
    let id = row.try_get::<Option<i64>, _>("id")?;
    Ok(id.map(RecordId::Int))
}

fn redact_url(raw: &str) -> Result<String, DatabaseError> {
    let mut url = url::Url::parse(raw)
        .map_err(|e| DatabaseError::Configuration(format!("invalid DATABASE_URL: {}", e)))?;
    if url.password().is_some() {
        let _ = url.set_password(Some("***"));
    }
    Ok(url.to_string())
}

fn bind_all<'q>(mut q: PgQuery<'q>, params: &[SqlValue]) -> PgQuery<'q> {
    for p in params {
        q = bind_param(q, p);
    }
    q
}

// PostgreSQL checks parameter types even for NULLs, so nulls carry their type.
fn bind_param<'q>(q: PgQuery<'q>, v: &SqlValue) -> PgQuery<'q> {
    match v {
        SqlValue::Null(SqlType::Bool) => q.bind(None::<bool>),
        SqlValue::Null(SqlType::Int) => q.bind(None::<i64>),
        SqlValue::Null(SqlType::Float) => q.bind(None::<f64>),
        SqlValue::Null(SqlType::Text) => q.bind(None::<String>),
        SqlValue::Null(SqlType::Uuid) => q.bind(None::<Uuid>),
        SqlValue::Bool(b) => q.bind(*b),
        SqlValue::Int(i) => q.bind(*i),
        SqlValue::Float(f) => q.bind(*f),
        SqlValue::Text(s) => q.bind(s.clone()),
        SqlValue::Uuid(u) => q.bind(*u),
    }
}

fn row_to_json(row: &PgRow) -> Result<Row, DatabaseError> {
    let mut map = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        if row.try_get_raw(i)?.is_null() {
            map.insert(column.name().to_string(), Value::Null);
            continue;
        }
        let value = match column.type_info().name() {
            "UUID" => row.try_get::<Uuid, _>(i).map(|u| Value::String(u.to_string()))?,
            "BOOL" => row.try_get::<bool, _>(i).map(Value::Bool)?,
            "INT2" => row.try_get::<i16, _>(i).map(Value::from)?,
            "INT4" => row.try_get::<i32, _>(i).map(Value::from)?,
            "INT8" => row.try_get::<i64, _>(i).map(Value::from)?,
            "FLOAT4" => float(f64::from(row.try_get::<f32, _>(i)?)),
            "FLOAT8" => float(row.try_get::<f64, _>(i)?),
            "TIMESTAMPTZ" => row
                .try_get::<DateTime<Utc>, _>(i)
                .map(|t| Value::String(t.to_rfc3339()))?,
            "TIMESTAMP" => row
                .try_get::<NaiveDateTime, _>(i)
                .map(|t| Value::String(t.to_string()))?,
            "DATE" => row.try_get::<NaiveDate, _>(i).map(|d| Value::String(d.to_string()))?,
            "JSON" | "JSONB" => row.try_get::<Value, _>(i)?,
            _ => row.try_get::<String, _>(i).map(Value::String)?,
        };
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_passwords_in_urls() {
        let shown = redact_url("postgres://cards:secret@db:5432/cards").unwrap();
        assert!(!shown.contains("secret"));
        assert!(shown.starts_with("postgres://cards:***@db:5432/cards"));
    }

    #[test]
    fn inserts_gain_a_returning_clause() {
        assert_eq!(
            with_returning_id("INSERT INTO cards (year) VALUES ($1)"),
            "INSERT INTO cards (year) VALUES ($1) RETURNING id"
        );
        assert_eq!(
            with_returning_id("INSERT INTO cards (year) VALUES ($1);\n"),
            "INSERT INTO cards (year) VALUES ($1) RETURNING id"
        );
        assert_eq!(
            with_returning_id("INSERT INTO tenants (slug) VALUES ($1) ON CONFLICT (slug) DO NOTHING"),
            "INSERT INTO tenants (slug) VALUES ($1) ON CONFLICT (slug) DO NOTHING RETURNING id"
        );
    }

    #[test]
    fn existing_returning_clause_is_kept() {
        let sql = "INSERT INTO cards (year) VALUES ($1)\nRETURNING id, created_at";
        assert_eq!(with_returning_id(sql), sql);
        let lower = "insert into teams (name) values ($1) returning id";
        assert_eq!(with_returning_id(lower), lower);
    }

    #[test]
    fn rejects_unparsable_urls() {
        assert!(matches!(redact_url("not a url"), Err(DatabaseError::Configuration(_))));
    }
}
