use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::auth::permissions::Action;
use crate::database::Row;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, RequestContext};
use crate::services::Entity;
use crate::state::AppState;

fn entity(raw: &str) -> Result<Entity, ApiError> {
    raw.parse().map_err(ApiError::not_found)
}

/// GET /api/data/:entity
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(name): Path<String>,
) -> ApiResult<Vec<Row>> {
    let entity = entity(&name)?;
    let rows = ctx.data_service(&state).list(entity).await?;
    Ok(ApiResponse::success(rows))
}

/// POST /api/data/:entity
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(name): Path<String>,
    Json(body): Json<Row>,
) -> ApiResult<Row> {
    let entity = entity(&name)?;
    ctx.authorize(&state, Action::CreateRecords)?;
    let row = ctx.data_service(&state).create(entity, &body).await?;
    Ok(ApiResponse::created(row))
}

/// GET /api/data/:entity/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<Row> {
    let entity = entity(&name)?;
    let row = ctx.data_service(&state).find(entity, &id).await?;
    Ok(ApiResponse::success(row))
}

/// PUT /api/data/:entity/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((name, id)): Path<(String, String)>,
    Json(body): Json<Row>,
) -> ApiResult<Row> {
    let entity = entity(&name)?;
    ctx.authorize(&state, Action::ModifyRecords)?;
    let row = ctx.data_service(&state).update(entity, &id, &body).await?;
    Ok(ApiResponse::success(row))
}

/// DELETE /api/data/:entity/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let entity = entity(&name)?;
    ctx.authorize(&state, Action::ModifyRecords)?;
    ctx.data_service(&state).delete(entity, &id).await?;
    Ok(ApiResponse::success(json!({ "entity": entity, "id": id, "deleted": true })))
}
