use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::DEFAULT_TENANT_SLUG;
use crate::database::models::{Tenant, TenantStatus};
use crate::database::{fetch_all, fetch_one, execute, Backend, DatabaseError, SqlValue};

const TENANT_COLUMNS: &str = "id, name, slug, subscription_tier, max_users, status, created_at";

#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("Tenant already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid tenant slug: {0}")]
    InvalidSlug(String),
    #[error("Invalid tenant name: {0}")]
    InvalidName(String),
    #[error("Tenant not found: {0}")]
    NotFound(String),
    #[error("Tenant selection not allowed: {0}")]
    SelectionDenied(String),
    #[error("{0}")]
    Unsupported(String),
}

/// Input for [`TenantService::create`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewTenant {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub subscription_tier: Option<String>,
    #[serde(default)]
    pub max_users: Option<i64>,
}

/// Registry of tenants. Only meaningful under the multi-tenant engine.
#[derive(Debug, Clone)]
pub struct TenantService {
    backend: Arc<dyn Backend>,
}

impl TenantService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    fn ensure_supported(&self) -> Result<(), TenantError> {
        if self.backend.kind().is_multi_tenant() {
            Ok(())
        } else {
            Err(TenantError::Unsupported(
                "tenant administration requires multi-tenant mode".to_string(),
            ))
        }
    }

    pub async fn list(&self) -> Result<Vec<Tenant>, TenantError> {
        self.ensure_supported()?;
        let mut q = self.backend.query();
        q.push("SELECT ").push(TENANT_COLUMNS).push(" FROM tenants ORDER BY name");
        let rows = fetch_all(self.backend.as_ref(), &q).await?;
        Ok(rows.into_iter().map(Tenant::try_from).collect::<Result<_, _>>()?)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Tenant>, TenantError> {
        self.ensure_supported()?;
        let mut q = self.backend.query();
        q.push("SELECT ")
            .push(TENANT_COLUMNS)
            .push(" FROM tenants WHERE ")
            .push_eq("slug", SqlValue::text(slug));
        let row = fetch_one(self.backend.as_ref(), &q).await?;
        Ok(row.map(Tenant::try_from).transpose()?)
    }

    /// Look up a tenant a caller may work in: it must exist and be active.
    pub async fn get_active(&self, slug: &str) -> Result<Tenant, TenantError> {
        match self.get_by_slug(slug).await? {
            Some(tenant) if tenant.is_active() => Ok(tenant),
            Some(tenant) => {
                warn!(target: "audit", "Selection of {} tenant '{}' refused", tenant.status, slug);
                Err(TenantError::NotFound(slug.to_string()))
            }
            None => Err(TenantError::NotFound(slug.to_string())),
        }
    }

    pub async fn create(&self, input: NewTenant) -> Result<Tenant, TenantError> {
        self.ensure_supported()?;
        validate_slug(&input.slug)?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(TenantError::InvalidName("tenant name must not be empty".to_string()));
        }

        if self.get_by_slug(&input.slug).await?.is_some() {
            return Err(TenantError::AlreadyExists(input.slug));
        }

        let mut q = self.backend.query();
        q.push("INSERT INTO tenants (name, slug, subscription_tier, max_users) VALUES (")
            .bind(SqlValue::text(name))
            .push(", ")
            .bind(SqlValue::text(&input.slug))
            .push(", ")
            .bind(SqlValue::text(input.subscription_tier.as_deref().unwrap_or("free")))
            .push(", ")
            .bind(SqlValue::Int(input.max_users.unwrap_or(5)))
            .push(") ON CONFLICT (slug) DO NOTHING");
        // A concurrent create of the same slug lands here rather than on the unique index.
        if execute(self.backend.as_ref(), &q).await?.changes == 0 {
            return Err(TenantError::AlreadyExists(input.slug));
        }

        let tenant = self
            .get_by_slug(&input.slug)
            .await?
            .ok_or_else(|| TenantError::NotFound(input.slug.clone()))?;
        info!(target: "audit", "Created tenant '{}' ({})", tenant.slug, tenant.id);
        Ok(tenant)
    }

    /// Change a tenant's status. Scoped rows are left untouched.
    pub async fn set_status(&self, slug: &str, status: TenantStatus) -> Result<Tenant, TenantError> {
        self.ensure_supported()?;
        if slug == DEFAULT_TENANT_SLUG && status != TenantStatus::Active {
            return Err(TenantError::Unsupported("the default tenant cannot be deactivated".to_string()));
        }

        let mut q = self.backend.query();
        q.push("UPDATE tenants SET ")
            .push_eq("status", SqlValue::text(status.as_str()))
            .push(" WHERE ")
            .push_eq("slug", SqlValue::text(slug));
        let result = execute(self.backend.as_ref(), &q).await?;
        if result.changes == 0 {
            return Err(TenantError::NotFound(slug.to_string()));
        }

        info!(target: "audit", "Tenant '{}' is now {}", slug, status);
        self.get_by_slug(slug)
            .await?
            .ok_or_else(|| TenantError::NotFound(slug.to_string()))
    }
}

/// Slugs are lowercase ASCII letters, digits and inner hyphens, 2 to 63 long.
pub fn validate_slug(slug: &str) -> Result<(), TenantError> {
    if slug.len() < 2 || slug.len() > 63 {
        return Err(TenantError::InvalidSlug("slug must be 2 to 63 characters".to_string()));
    }
    if !slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return Err(TenantError::InvalidSlug(
            "slug can only contain lowercase letters, digits and hyphens".to_string(),
        ));
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(TenantError::InvalidSlug("slug cannot start or end with a hyphen".to_string()));
    }
    Ok(())
}
