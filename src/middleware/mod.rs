pub mod auth;
pub mod response;

pub use auth::{jwt_auth_middleware, RequestContext, TENANT_HEADER};
pub use response::{ApiResponse, ApiResult};
