use thiserror::Error;

/// Errors raised by the storage backends and the backend selector
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid backend configuration: {0}")]
    Configuration(String),

    #[error("Storage unavailable: {0}")]
    Connection(String),

    #[error("Invalid record id: {0}")]
    InvalidId(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

// Transient unavailability gets its own kind so callers can decide on retries.
impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => DatabaseError::Connection(err.to_string()),
            sqlx::Error::Configuration(_) => DatabaseError::Configuration(err.to_string()),
            other => DatabaseError::Sqlx(other),
        }
    }
}
