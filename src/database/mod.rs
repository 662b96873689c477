//! Storage engines and the uniform query interface over them.

pub mod backend;
pub mod error;
pub mod legacy;
pub mod models;
pub mod multi_tenant;
pub mod schema;
pub mod selector;
pub mod value;

pub use backend::{execute, fetch_all, fetch_one, Backend, BackendKind, PlaceholderStyle, RunResult, SqlQuery};
pub use error::DatabaseError;
pub use legacy::LegacyBackend;
pub use multi_tenant::MultiTenantBackend;
pub use selector::select_backend;
pub use value::{IdKind, RecordId, Row, SqlType, SqlValue};
