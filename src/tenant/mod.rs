//! Tenant partitioning: the registry, the per-request context and its resolver.

pub mod context;
pub mod resolver;
pub mod service;

use uuid::Uuid;

pub use context::TenantContext;
pub use resolver::TenantResolver;
pub use service::{NewTenant, TenantError, TenantService};

/// Reserved tenant that owns rows of installations not yet partitioned
pub const DEFAULT_TENANT_ID: Uuid = Uuid::from_u128(1);
pub const DEFAULT_TENANT_SLUG: &str = "default";
pub const DEFAULT_TENANT_NAME: &str = "Default";
