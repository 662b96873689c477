use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DEFAULT_TENANT_ID, DEFAULT_TENANT_NAME, DEFAULT_TENANT_SLUG};
use crate::database::models::Tenant;

/// Tenant a request operates in. Built per request and never shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub tenant_slug: String,
    pub tenant_name: String,
}

impl TenantContext {
    pub fn default_tenant() -> Self {
        Self {
            tenant_id: DEFAULT_TENANT_ID,
            tenant_slug: DEFAULT_TENANT_SLUG.to_string(),
            tenant_name: DEFAULT_TENANT_NAME.to_string(),
        }
    }
}

impl From<&Tenant> for TenantContext {
    fn from(tenant: &Tenant) -> Self {
        Self {
            tenant_id: tenant.id,
            tenant_slug: tenant.slug.clone(),
            tenant_name: tenant.name.clone(),
        }
    }
}
