use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{elevated, protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// Build the HTTP router over an initialized [`AppState`].
pub fn app(state: AppState) -> Router {
    let request_logging = state.config.api.enable_request_logging;

    let router = Router::new()
        // Public
        .route("/health", get(public::health))
        // Authenticated API
        .merge(api_routes(state.clone()))
        .with_state(state);

    let router = if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.layer(CorsLayer::permissive())
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(data_routes())
        .merge(tenant_routes())
        .merge(user_routes())
        .merge(upload_routes())
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn data_routes() -> Router<AppState> {
    use protected::data;

    Router::new()
        .route("/api/data/:entity", get(data::list).post(data::create))
        .route(
            "/api/data/:entity/:id",
            get(data::show).put(data::update).delete(data::remove),
        )
}

fn tenant_routes() -> Router<AppState> {
    use elevated::tenants;

    Router::new()
        .route("/api/tenants", get(tenants::list).post(tenants::create))
        .route("/api/tenants/current", get(protected::tenant::current))
        .route("/api/tenants/:slug/status", put(tenants::set_status))
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route("/api/users", get(users::list))
        .route("/api/users/:id/role", put(users::set_role))
}

fn upload_routes() -> Router<AppState> {
    use protected::uploads;

    Router::new()
        .route("/api/uploads", post(uploads::create))
        .route("/api/uploads/:id", get(uploads::show))
        .route("/api/uploads/:id/complete", post(uploads::complete))
}
