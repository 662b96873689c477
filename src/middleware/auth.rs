use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::permissions::{authorize, Action};
use crate::auth::{validate_jwt, Session};
use crate::error::ApiError;
use crate::services::ScopedDataService;
use crate::state::AppState;
use crate::tenant::TenantContext;

/// Request header a global admin uses to pick the tenant to work in
pub const TENANT_HEADER: &str = "x-tenant-slug";

/// Authenticated caller and the tenant the request runs in
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub session: Session,
    pub tenant: Option<TenantContext>,
}

impl RequestContext {
    /// Fresh data service for this request only.
    pub fn data_service(&self, state: &AppState) -> ScopedDataService {
        ScopedDataService::new(state.backend.clone(), self.tenant.clone())
    }

    pub fn authorize(&self, state: &AppState, action: Action) -> Result<(), ApiError> {
        authorize(&self.session, action, state.backend.kind())?;
        Ok(())
    }
}

/// JWT authentication middleware: validates the token, resolves the tenant and
/// injects a [`RequestContext`] into the request.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(request.headers()).map_err(ApiError::unauthorized)?;
    let session = Session::from(validate_jwt(&token, &state.config.security.jwt_secret)?);

    let selection = request
        .headers()
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let tenant = state
        .resolver
        .resolve_selected(Some(&session), selection.as_deref(), &state.tenants)
        .await?;

    request.extensions_mut().insert(RequestContext { session, tenant });
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
