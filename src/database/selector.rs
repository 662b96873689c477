use std::sync::Arc;
use tracing::info;

use super::backend::Backend;
use super::error::DatabaseError;
use super::legacy::LegacyBackend;
use super::multi_tenant::MultiTenantBackend;
use super::schema;
use crate::config::DatabaseConfig;

/// Pick the storage engine for this process.
///
/// Called once at startup. The two engines use incompatible schemas and id
/// spaces, so the returned handle is never swapped afterwards. A backend that
/// cannot connect fails here rather than on the first request.
pub async fn select_backend(config: &DatabaseConfig) -> Result<Arc<dyn Backend>, DatabaseError> {
    config.validate()?;

    let backend: Arc<dyn Backend> = if config.multi_tenant {
        info!("Multi-tenant mode enabled; using PostgreSQL backend");
        Arc::new(MultiTenantBackend::connect(config).await?)
    } else {
        info!("Multi-tenant mode disabled; using legacy SQLite backend");
        Arc::new(LegacyBackend::connect(config).await?)
    };

    if config.auto_migrate {
        schema::bootstrap(backend.as_ref()).await?;
    }

    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::BackendKind;

    fn legacy_config(path: &str) -> DatabaseConfig {
        DatabaseConfig { legacy_path: path.to_string(), ..DatabaseConfig::default() }
    }

    #[tokio::test]
    async fn flag_off_selects_legacy() {
        let backend = select_backend(&legacy_config(":memory:")).await.unwrap();
        assert_eq!(backend.kind(), BackendKind::Legacy);
        assert!(backend.test_connection().await);
    }

    #[tokio::test]
    async fn flag_on_without_url_fails_fast() {
        let config = DatabaseConfig { multi_tenant: true, url: None, ..DatabaseConfig::default() };
        let err = select_backend(&config).await.unwrap_err();
        assert!(matches!(err, DatabaseError::ConfigMissing("DATABASE_URL")));
    }

    #[tokio::test]
    async fn flag_on_with_non_postgres_url_is_a_configuration_error() {
        let config = DatabaseConfig {
            multi_tenant: true,
            url: Some("mysql://localhost/cards".to_string()),
            ..DatabaseConfig::default()
        };
        let err = select_backend(&config).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Configuration(_)));
    }
}
