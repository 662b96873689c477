//! Parameter and identifier types shared by both storage engines.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use super::error::DatabaseError;

/// A result row as returned by `get`/`all`: column name to JSON value.
pub type Row = Map<String, Value>;

/// Declared type of a bound parameter, used for typed NULLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Bool,
    Int,
    Float,
    Text,
    Uuid,
}

/// A bindable query parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null(SqlType),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
}

impl SqlValue {
    pub fn text(s: impl Into<String>) -> Self {
        SqlValue::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }
}

impl From<&RecordId> for SqlValue {
    fn from(id: &RecordId) -> Self {
        match id {
            RecordId::Int(i) => SqlValue::Int(*i),
            RecordId::Uuid(u) => SqlValue::Uuid(*u),
        }
    }
}

impl From<Uuid> for SqlValue {
    fn from(u: Uuid) -> Self {
        SqlValue::Uuid(u)
    }
}

/// Primary-key strategy of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Auto-incrementing integers (legacy engine)
    Integer,
    /// Database-generated UUIDs (multi-tenant engine)
    Uuid,
}

impl IdKind {
    /// Parse an id from its textual form (URL path segment, CLI argument).
    pub fn parse(self, raw: &str) -> Result<RecordId, DatabaseError> {
        let raw = raw.trim();
        match self {
            IdKind::Integer => raw
                .parse::<i64>()
                .map(RecordId::Int)
                .map_err(|_| DatabaseError::InvalidId(format!("expected integer id, got '{}'", raw))),
            IdKind::Uuid => Uuid::parse_str(raw)
                .map(RecordId::Uuid)
                .map_err(|_| DatabaseError::InvalidId(format!("expected UUID id, got '{}'", raw))),
        }
    }

    /// Interpret a JSON value (request body or row column) as an id.
    pub fn from_json(self, value: &Value) -> Option<RecordId> {
        match (self, value) {
            (IdKind::Integer, Value::Number(n)) => n.as_i64().map(RecordId::Int),
            (_, Value::String(s)) => self.parse(s).ok(),
            _ => None,
        }
    }

    pub fn sql_type(self) -> SqlType {
        match self {
            IdKind::Integer => SqlType::Int,
            IdKind::Uuid => SqlType::Uuid,
        }
    }
}

/// Identifier of a stored row, in whichever id space the backend uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Uuid(Uuid),
}

impl RecordId {
    pub fn to_json(&self) -> Value {
        match self {
            RecordId::Int(i) => Value::from(*i),
            RecordId::Uuid(u) => Value::String(u.to_string()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(i) => write!(f, "{}", i),
            RecordId::Uuid(u) => write!(f, "{}", u),
        }
    }
}
