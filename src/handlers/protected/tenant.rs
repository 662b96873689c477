use axum::{extract::State, Extension};
use serde::Serialize;

use crate::auth::permissions::{GlobalRole, OrganizationRole};
use crate::database::BackendKind;
use crate::middleware::{ApiResponse, ApiResult, RequestContext};
use crate::state::AppState;
use crate::tenant::TenantContext;

#[derive(Debug, Serialize)]
pub struct CurrentTenant {
    pub engine: BackendKind,
    pub user_id: String,
    pub username: String,
    pub global_role: GlobalRole,
    pub organization_role: Option<OrganizationRole>,
    pub tenant: Option<TenantContext>,
}

/// GET /api/tenants/current - who the caller is and which tenant they are in
pub async fn current(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>) -> ApiResult<CurrentTenant> {
    Ok(ApiResponse::success(CurrentTenant {
        engine: state.backend.kind(),
        user_id: ctx.session.user_id,
        username: ctx.session.username,
        global_role: ctx.session.global_role,
        organization_role: ctx.session.organization_role,
        tenant: ctx.tenant,
    }))
}
