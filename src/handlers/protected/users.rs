use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::auth::permissions::Action;
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, RequestContext};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: String,
}

/// GET /api/users - members of the current tenant
pub async fn list(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>) -> ApiResult<Vec<User>> {
    ctx.authorize(&state, Action::ManageOrganizationUsers)?;
    let users = ctx.data_service(&state).get_users().await?;
    Ok(ApiResponse::success(users))
}

/// PUT /api/users/:id/role
pub async fn set_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<RoleChange>,
) -> ApiResult<User> {
    ctx.authorize(&state, Action::ManageOrganizationUsers)?;
    let user = ctx.data_service(&state).set_user_role(&id, &body.role).await?;
    Ok(ApiResponse::success(user))
}
