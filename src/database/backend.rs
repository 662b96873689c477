use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use super::error::DatabaseError;
use super::value::{IdKind, RecordId, Row, SqlValue};

/// Which storage engine services the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Single-file, single-tenant SQLite engine with integer ids
    Legacy,
    /// Tenant-partitioned PostgreSQL engine with UUID ids
    MultiTenant,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Legacy => "legacy",
            BackendKind::MultiTenant => "multi_tenant",
        }
    }

    pub fn is_multi_tenant(self) -> bool {
        self == BackendKind::MultiTenant
    }

    pub fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            BackendKind::Legacy => PlaceholderStyle::Positional,
            BackendKind::MultiTenant => PlaceholderStyle::Numbered,
        }
    }

    pub fn id_kind(self) -> IdKind {
        match self {
            BackendKind::Legacy => IdKind::Integer,
            BackendKind::MultiTenant => IdKind::Uuid,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bind-parameter syntax of a SQL dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?`
    Positional,
    /// `$1`, `$2`, ...
    Numbered,
}

/// Outcome of a `run` call
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Generated id of an inserted row
    pub id: Option<RecordId>,
    pub changes: u64,
}

/// Uniform query interface over both engines.
///
/// A single handle is created at startup and shared by every request; it never
/// carries a tenant, the per-request data service does.
#[async_trait]
pub trait Backend: Send + Sync + fmt::Debug {
    fn kind(&self) -> BackendKind;

    fn id_kind(&self) -> IdKind {
        self.kind().id_kind()
    }

    /// Start a query using this backend's placeholder syntax.
    fn query(&self) -> SqlQuery {
        SqlQuery::new(self.kind().placeholder_style())
    }

    async fn get(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, DatabaseError>;

    async fn all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DatabaseError>;

    /// Execute a statement. On INSERT the generated id is returned.
    async fn run(&self, sql: &str, params: &[SqlValue]) -> Result<RunResult, DatabaseError>;

    /// Connection-health probe; never errors.
    async fn test_connection(&self) -> bool;

    /// Close the underlying pool (shutdown).
    async fn close(&self);
}

pub(crate) fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .map_or(false, |head| head.eq_ignore_ascii_case("insert"))
}

/// SQL text plus parameters, numbered according to the backend's dialect
#[derive(Debug, Clone)]
pub struct SqlQuery {
    style: PlaceholderStyle,
    sql: String,
    params: Vec<SqlValue>,
}

impl SqlQuery {
    pub fn new(style: PlaceholderStyle) -> Self {
        Self { style, sql: String::new(), params: Vec::new() }
    }

    /// Append raw SQL text.
    pub fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push_str(fragment);
        self
    }

    /// Append a double-quoted identifier.
    pub fn push_ident(&mut self, ident: &str) -> &mut Self {
        self.sql.push('"');
        self.sql.push_str(&ident.replace('"', "\"\""));
        self.sql.push('"');
        self
    }

    /// Append a placeholder and record its value.
    pub fn bind(&mut self, value: SqlValue) -> &mut Self {
        self.params.push(value);
        match self.style {
            PlaceholderStyle::Positional => self.sql.push('?'),
            PlaceholderStyle::Numbered => {
                self.sql.push('$');
                self.sql.push_str(&self.params.len().to_string());
            }
        }
        self
    }

    /// Append `"col" = <placeholder>`.
    pub fn push_eq(&mut self, column: &str, value: SqlValue) -> &mut Self {
        self.push_ident(column).push(" = ").bind(value)
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }
}

/// Run a prepared query against a backend.
pub async fn fetch_one(backend: &dyn Backend, q: &SqlQuery) -> Result<Option<Row>, DatabaseError> {
    backend.get(q.sql(), q.params()).await
}

pub async fn fetch_all(backend: &dyn Backend, q: &SqlQuery) -> Result<Vec<Row>, DatabaseError> {
    backend.all(q.sql(), q.params()).await
}

pub async fn execute(backend: &dyn Backend, q: &SqlQuery) -> Result<RunResult, DatabaseError> {
    backend.run(q.sql(), q.params()).await
}
