use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, RequestContext};
use crate::state::AppState;
use crate::uploads::UploadSession;

#[derive(Debug, Deserialize)]
pub struct CompleteUpload {
    pub image_url: String,
}

// Sessions are visible to their owner and to members of the same tenant.
fn visible_to(session: &UploadSession, ctx: &RequestContext) -> bool {
    session.user_id == ctx.session.user_id
        || (session.tenant_id.is_some() && session.tenant_id == ctx.tenant.as_ref().map(|t| t.tenant_id))
}

fn find(state: &AppState, ctx: &RequestContext, id: &str) -> Result<UploadSession, ApiError> {
    state
        .uploads
        .get(id)
        .filter(|s| visible_to(s, ctx))
        .ok_or_else(|| ApiError::not_found(format!("upload session {} not found", id)))
}

/// POST /api/uploads - open a hand-off session
pub async fn create(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>) -> ApiResult<UploadSession> {
    let id = Uuid::new_v4().simple().to_string();
    let tenant_id = ctx.tenant.as_ref().map(|t| t.tenant_id);
    let session = state.uploads.create(&id, &ctx.session.user_id, tenant_id);
    Ok(ApiResponse::created(session))
}

/// GET /api/uploads/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<UploadSession> {
    Ok(ApiResponse::success(find(&state, &ctx, &id)?))
}

/// POST /api/uploads/:id/complete
pub async fn complete(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<CompleteUpload>,
) -> ApiResult<UploadSession> {
    if body.image_url.trim().is_empty() {
        return Err(ApiError::validation_error("image_url is required", Some("image_url".to_string())));
    }
    find(&state, &ctx, &id)?;
    if !state.uploads.set_uploaded(&id, &body.image_url) {
        // Still present means another device completed it first.
        return Err(match state.uploads.get(&id) {
            Some(_) => ApiError::conflict(format!("upload session {} is already complete", id)),
            None => ApiError::not_found(format!("upload session {} not found", id)),
        });
    }
    Ok(ApiResponse::success(find(&state, &ctx, &id)?))
}
