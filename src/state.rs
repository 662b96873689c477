use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Backend;
use crate::tenant::{TenantResolver, TenantService};
use crate::uploads::UploadSessionStore;

/// Process-wide handles shared by every request.
///
/// Built once in `main` after the backend is selected: config, backend,
/// resolver, upload store. Nothing in here carries a tenant.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: Arc<dyn Backend>,
    pub resolver: TenantResolver,
    pub tenants: TenantService,
    pub uploads: Arc<UploadSessionStore>,
}

impl AppState {
    pub fn new(config: AppConfig, backend: Arc<dyn Backend>) -> Self {
        let resolver = TenantResolver::new(backend.kind());
        let tenants = TenantService::new(backend.clone());
        let uploads = Arc::new(UploadSessionStore::new(config.uploads.session_ttl_secs));
        Self {
            config: Arc::new(config),
            backend,
            resolver,
            tenants,
            uploads,
        }
    }
}
