use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::database::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Selects the PostgreSQL engine; otherwise the legacy SQLite file is used
    pub multi_tenant: bool,
    pub url: Option<String>,
    /// SQLite file path, or `:memory:`
    pub legacy_path: String,
    pub max_connections: u32,
    /// Seconds
    pub connection_timeout: u64,
    /// Run idempotent DDL after connecting
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_audit_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub session_ttl_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            multi_tenant: false,
            url: None,
            legacy_path: "cards.db".to_string(),
            max_connections: 10,
            connection_timeout: 30,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Check that the selected engine has what it needs to connect.
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.max_connections == 0 {
            return Err(DatabaseError::Configuration(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }
        if self.multi_tenant {
            let url = self.url.as_deref().ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
            if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                return Err(DatabaseError::Configuration(
                    "multi-tenant mode requires a postgres:// DATABASE_URL".to_string(),
                ));
            }
        } else if self.legacy_path.trim().is_empty() {
            return Err(DatabaseError::ConfigMissing("LEGACY_DATABASE_PATH"));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Build the config from `APP_ENV` presets plus individual env overrides.
    ///
    /// A value that is present but cannot be parsed is a configuration error.
    /// Falling back to the preset could silently pick the wrong engine.
    pub fn from_env() -> Result<Self, DatabaseError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DatabaseError> {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides(lookup)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DatabaseError> {
        // Database overrides
        if let Some(v) = lookup("MULTI_TENANT_ENABLED") {
            self.database.multi_tenant = flag("MULTI_TENANT_ENABLED", &v)?;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Some(v) = lookup("LEGACY_DATABASE_PATH") {
            self.database.legacy_path = v;
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = number("DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = number("DATABASE_CONNECTION_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("DATABASE_AUTO_MIGRATE") {
            self.database.auto_migrate = flag("DATABASE_AUTO_MIGRATE", &v)?;
        }

        // API overrides
        if let Some(v) = lookup("CARD_VAULT_PORT") {
            self.api.port = number("CARD_VAULT_PORT", &v)?;
        } else if let Some(v) = lookup("PORT") {
            self.api.port = number("PORT", &v)?;
        }
        if let Some(v) = lookup("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = flag("API_ENABLE_REQUEST_LOGGING", &v)?;
        }

        // Security overrides
        if let Some(v) = lookup("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = lookup("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = number("SECURITY_JWT_EXPIRY_HOURS", &v)?;
        }
        if let Some(v) = lookup("SECURITY_ENABLE_AUDIT_LOGGING") {
            self.security.enable_audit_logging = flag("SECURITY_ENABLE_AUDIT_LOGGING", &v)?;
        }

        // Upload overrides
        if let Some(v) = lookup("UPLOAD_SESSION_TTL_SECS") {
            self.uploads.session_ttl_secs = number("UPLOAD_SESSION_TTL_SECS", &v)?;
        }

        Ok(self)
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig::default(),
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: "card-vault-development-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                enable_audit_logging: false,
            },
            uploads: UploadConfig { session_ttl_secs: 600 },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                ..DatabaseConfig::default()
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                enable_audit_logging: true,
            },
            uploads: UploadConfig { session_ttl_secs: 600 },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                ..DatabaseConfig::default()
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: false,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                enable_audit_logging: true,
            },
            uploads: UploadConfig { session_ttl_secs: 600 },
        }
    }
}

fn flag(name: &str, raw: &str) -> Result<bool, DatabaseError> {
    parse_flag(raw).ok_or_else(|| DatabaseError::Configuration(format!("{} must be true or false, got '{}'", name, raw)))
}

fn number<T: FromStr>(name: &str, raw: &str) -> Result<T, DatabaseError> {
    raw.trim()
        .parse()
        .map_err(|_| DatabaseError::Configuration(format!("{} must be a number, got '{}'", name, raw)))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(!config.database.multi_tenant);
        assert_eq!(config.uploads.session_ttl_secs, 600);
        assert!(!config.security.jwt_secret.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.security.enable_audit_logging);
        assert!(config.security.jwt_secret.is_empty());
        assert_eq!(config.database.max_connections, 50);
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    }

    #[test]
    fn env_overrides_apply_on_top_of_presets() {
        let config = AppConfig::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("MULTI_TENANT_ENABLED", "yes"),
            ("DATABASE_URL", "postgres://cards@localhost/cards"),
            ("PORT", "8080"),
            ("UPLOAD_SESSION_TTL_SECS", "120"),
        ]))
        .unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert!(!config.is_development());
        assert!(config.database.multi_tenant);
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.uploads.session_ttl_secs, 120);
        assert!(config.database.validate().is_ok());
    }

    #[test]
    fn unrecognised_engine_flag_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[("MULTI_TENANT_ENABLED", "enabled")])).unwrap_err();
        assert!(matches!(err, DatabaseError::Configuration(msg) if msg.contains("MULTI_TENANT_ENABLED")));

        let err = AppConfig::from_lookup(lookup(&[("DATABASE_AUTO_MIGRATE", "sometimes")])).unwrap_err();
        assert!(matches!(err, DatabaseError::Configuration(_)));
    }

    #[test]
    fn malformed_numbers_are_fatal() {
        assert!(AppConfig::from_lookup(lookup(&[("DATABASE_MAX_CONNECTIONS", "ten")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("CARD_VAULT_PORT", "70000")])).is_err());
    }

    #[test]
    fn multi_tenant_requires_postgres_url() {
        let mut config = DatabaseConfig { multi_tenant: true, ..DatabaseConfig::default() };
        assert!(matches!(config.validate(), Err(DatabaseError::ConfigMissing("DATABASE_URL"))));

        config.url = Some("sqlite://cards.db".to_string());
        assert!(matches!(config.validate(), Err(DatabaseError::Configuration(_))));

        config.url = Some("postgres://cards@localhost/cards".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn legacy_requires_a_path() {
        let config = DatabaseConfig { legacy_path: " ".to_string(), ..DatabaseConfig::default() };
        assert!(matches!(config.validate(), Err(DatabaseError::ConfigMissing("LEGACY_DATABASE_PATH"))));
    }
}
