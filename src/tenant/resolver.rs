use tracing::{debug, warn};

use super::{TenantContext, TenantError, TenantService};
use crate::auth::permissions::{can_switch_tenants, is_global_admin};
use crate::auth::Session;
use crate::database::BackendKind;

/// Derives the tenant a request runs in from its session.
///
/// Bound users resolve from their token alone. A global admin without a bound
/// tenant is never assigned one implicitly; without an explicit selection the
/// request runs in global scope and tenant data is out of reach.
#[derive(Debug, Clone)]
pub struct TenantResolver {
    engine: BackendKind,
}

impl TenantResolver {
    pub fn new(engine: BackendKind) -> Self {
        Self { engine }
    }

    pub fn resolve(&self, session: Option<&Session>) -> Option<TenantContext> {
        let session = session?;
        if !self.engine.is_multi_tenant() {
            return None;
        }
        if let Some(context) = session.bound_tenant() {
            return Some(context);
        }
        if is_global_admin(session.global_role) {
            return None;
        }
        // Unpartitioned accounts belong to the default tenant.
        Some(TenantContext::default_tenant())
    }

    /// Resolve with an explicit tenant selection (the `X-Tenant-Slug` header).
    ///
    /// The selection is validated here on every request: a global admin may pick
    /// any active tenant, everyone else may only name the tenant they already
    /// belong to.
    pub async fn resolve_selected(
        &self,
        session: Option<&Session>,
        selection: Option<&str>,
        tenants: &TenantService,
    ) -> Result<Option<TenantContext>, TenantError> {
        let implicit = self.resolve(session);
        let (session, slug) = match (session, selection.map(str::trim).filter(|s| !s.is_empty())) {
            (Some(session), Some(slug)) if self.engine.is_multi_tenant() => (session, slug),
            _ => return Ok(implicit),
        };

        if can_switch_tenants(session.global_role) {
            let tenant = tenants.get_active(slug).await?;
            debug!(target: "audit", "Global admin {} selected tenant '{}'", session.user_id, slug);
            return Ok(Some(TenantContext::from(&tenant)));
        }

        match implicit {
            Some(context) if context.tenant_slug == slug => Ok(Some(context)),
            _ => {
                warn!(
                    target: "audit",
                    "User {} attempted to select tenant '{}' outside their binding",
                    session.user_id, slug
                );
                Err(TenantError::SelectionDenied(slug.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::permissions::{GlobalRole, OrganizationRole};
    use crate::auth::Claims;
    use crate::testing::{row, ScriptedBackend};
    use serde_json::json;
    use uuid::Uuid;

    fn acme() -> TenantContext {
        TenantContext {
            tenant_id: Uuid::from_u128(0xa),
            tenant_slug: "acme".to_string(),
            tenant_name: "Acme".to_string(),
        }
    }

    fn member() -> Session {
        Session::from(Claims::new("7", "ada", 1).with_organization(&acme(), OrganizationRole::User))
    }

    fn global_admin() -> Session {
        Session::from(Claims::new("1", "root", 1).with_global_role(GlobalRole::GlobalAdmin))
    }

    #[test]
    fn no_session_means_no_context() {
        assert_eq!(TenantResolver::new(BackendKind::MultiTenant).resolve(None), None);
    }

    #[test]
    fn legacy_mode_never_has_a_context() {
        let resolver = TenantResolver::new(BackendKind::Legacy);
        assert_eq!(resolver.resolve(Some(&member())), None);
    }

    #[test]
    fn bound_users_resolve_from_claims() {
        let resolver = TenantResolver::new(BackendKind::MultiTenant);
        assert_eq!(resolver.resolve(Some(&member())), Some(acme()));
    }

    #[test]
    fn global_admin_is_not_assigned_a_tenant() {
        let resolver = TenantResolver::new(BackendKind::MultiTenant);
        assert_eq!(resolver.resolve(Some(&global_admin())), None);
    }

    #[test]
    fn unbound_users_fall_back_to_default_tenant() {
        let resolver = TenantResolver::new(BackendKind::MultiTenant);
        let session = Session::from(Claims::new("9", "old", 1));
        assert_eq!(resolver.resolve(Some(&session)), Some(TenantContext::default_tenant()));
    }

    #[tokio::test]
    async fn global_admin_selection_is_checked_against_registry() {
        let backend = ScriptedBackend::new(BackendKind::MultiTenant);
        backend.push_row(Some(row(json!({
            "id": Uuid::from_u128(0xb).to_string(),
            "name": "Beta",
            "slug": "beta",
            "subscription_tier": "free",
            "max_users": 5,
            "status": "active",
            "created_at": "2024-05-01T12:00:00+00:00"
        }))));
        let tenants = TenantService::new(backend.clone());
        let resolver = TenantResolver::new(BackendKind::MultiTenant);

        let context = resolver
            .resolve_selected(Some(&global_admin()), Some("beta"), &tenants)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(context.tenant_id, Uuid::from_u128(0xb));

        let missing = resolver.resolve_selected(Some(&global_admin()), Some("nope"), &tenants).await;
        assert!(matches!(missing, Err(TenantError::NotFound(_))));
    }

    #[tokio::test]
    async fn members_cannot_select_another_tenant() {
        let backend = ScriptedBackend::new(BackendKind::MultiTenant);
        let tenants = TenantService::new(backend.clone());
        let resolver = TenantResolver::new(BackendKind::MultiTenant);

        let same = resolver.resolve_selected(Some(&member()), Some("acme"), &tenants).await.unwrap();
        assert_eq!(same, Some(acme()));

        let other = resolver.resolve_selected(Some(&member()), Some("beta"), &tenants).await;
        assert!(matches!(other, Err(TenantError::SelectionDenied(_))));
        assert!(backend.calls().is_empty());
    }
}
