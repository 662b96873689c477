//! Test doubles shared by unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::database::{Backend, BackendKind, DatabaseError, RecordId, Row, RunResult, SqlValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    All,
    Run,
}

/// A statement the backend was asked to execute
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub sql: String,
    pub params: Vec<SqlValue>,
}

#[derive(Debug, Default)]
struct Script {
    gets: VecDeque<Result<Option<Row>, DatabaseError>>,
    alls: VecDeque<Result<Vec<Row>, DatabaseError>>,
    runs: VecDeque<Result<RunResult, DatabaseError>>,
    calls: Vec<Call>,
}

/// Backend that replays queued answers and records every statement.
///
/// Unscripted calls answer with nothing: `None`, an empty list, or zero changes.
#[derive(Debug)]
pub struct ScriptedBackend {
    kind: BackendKind,
    script: Mutex<Script>,
}

impl ScriptedBackend {
    pub fn new(kind: BackendKind) -> Arc<Self> {
        Arc::new(Self { kind, script: Mutex::new(Script::default()) })
    }

    pub fn push_row(&self, row: Option<Row>) -> &Self {
        self.script.lock().gets.push_back(Ok(row));
        self
    }

    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.script.lock().alls.push_back(Ok(rows));
        self
    }

    pub fn push_run(&self, changes: u64, id: Option<RecordId>) -> &Self {
        self.script.lock().runs.push_back(Ok(RunResult { id, changes }));
        self
    }

    pub fn push_get_error(&self, error: DatabaseError) -> &Self {
        self.script.lock().gets.push_back(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().calls.clone()
    }

    pub fn runs(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.method == Method::Run).collect()
    }

    fn record(&self, method: Method, sql: &str, params: &[SqlValue]) {
        self.script.lock().calls.push(Call { method, sql: sql.to_string(), params: params.to_vec() });
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn get(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, DatabaseError> {
        self.record(Method::Get, sql, params);
        self.script.lock().gets.pop_front().unwrap_or(Ok(None))
    }

    async fn all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DatabaseError> {
        self.record(Method::All, sql, params);
        self.script.lock().alls.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn run(&self, sql: &str, params: &[SqlValue]) -> Result<RunResult, DatabaseError> {
        self.record(Method::Run, sql, params);
        self.script
            .lock()
            .runs
            .pop_front()
            .unwrap_or(Ok(RunResult { id: None, changes: 0 }))
    }

    async fn test_connection(&self) -> bool {
        true
    }

    async fn close(&self) {}
}

/// Build a row from a JSON object literal.
pub fn row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}
