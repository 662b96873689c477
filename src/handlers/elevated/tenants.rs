use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::auth::permissions::Action;
use crate::database::models::{Tenant, TenantStatus};
use crate::middleware::{ApiResponse, ApiResult, RequestContext};
use crate::state::AppState;
use crate::tenant::NewTenant;

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: TenantStatus,
}

/// GET /api/tenants
pub async fn list(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>) -> ApiResult<Vec<Tenant>> {
    ctx.authorize(&state, Action::ViewGlobalDashboards)?;
    Ok(ApiResponse::success(state.tenants.list().await?))
}

/// POST /api/tenants
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewTenant>,
) -> ApiResult<Tenant> {
    ctx.authorize(&state, Action::ManageGlobalSystem)?;
    Ok(ApiResponse::created(state.tenants.create(body).await?))
}

/// PUT /api/tenants/:slug/status
pub async fn set_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(slug): Path<String>,
    Json(body): Json<StatusChange>,
) -> ApiResult<Tenant> {
    ctx.authorize(&state, Action::ManageGlobalSystem)?;
    Ok(ApiResponse::success(state.tenants.set_status(&slug, body.status).await?))
}
