pub mod data_service;
pub mod entity;

pub use data_service::{DataError, Scope, ScopedDataService};
pub use entity::{Column, ColumnKind, Entity};
