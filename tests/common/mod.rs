#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use reqwest::StatusCode as ReqwestStatus;
use serde_json::Value;
use tower::ServiceExt;

use card_vault_api::auth::permissions::{GlobalRole, LegacyRole, OrganizationRole};
use card_vault_api::auth::{generate_jwt, Claims};
use card_vault_api::config::{AppConfig, DatabaseConfig};
use card_vault_api::database::{select_backend, Backend};
use card_vault_api::tenant::TenantContext;
use card_vault_api::{app, AppState};

pub const TEST_SECRET: &str = "card-vault-test-secret";

/// A running server binary. Dropping it kills the process and removes its database.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub db_path: PathBuf,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let db_path = std::env::temp_dir().join(format!("card-vault-test-{}.db", port));
        let _ = std::fs::remove_file(&db_path);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_card-vault-api"));
        cmd.env("CARD_VAULT_PORT", port.to_string())
            .env("MULTI_TENANT_ENABLED", "false")
            .env("LEGACY_DATABASE_PATH", &db_path)
            .env("JWT_SECRET", TEST_SECRET)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, db_path, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == ReqwestStatus::OK || resp.status() == ReqwestStatus::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.db_path.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

pub async fn spawn_server() -> Result<TestServer> {
    let server = TestServer::spawn()?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

fn test_config(database: DatabaseConfig) -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = TEST_SECRET.to_string();
    config.database = database;
    config
}

/// Fresh in-memory legacy deployment with the schema in place.
pub async fn legacy_state() -> Result<AppState> {
    let database = DatabaseConfig { legacy_path: ":memory:".to_string(), ..DatabaseConfig::default() };
    let backend = select_backend(&database).await?;
    Ok(AppState::new(test_config(database), backend))
}

/// Multi-tenant deployment against `TEST_DATABASE_URL`, or `None` when unset.
pub async fn multi_tenant_state() -> Result<Option<AppState>> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping PostgreSQL test");
        return Ok(None);
    };
    let database = DatabaseConfig {
        multi_tenant: true,
        url: Some(url),
        max_connections: 4,
        ..DatabaseConfig::default()
    };
    let backend = select_backend(&database).await?;
    Ok(Some(AppState::new(test_config(database), backend)))
}

pub fn backend(state: &AppState) -> Arc<dyn Backend> {
    state.backend.clone()
}

pub fn legacy_token(user_id: &str, role: LegacyRole) -> String {
    let claims = Claims::new(user_id, format!("user{}", user_id), 1).with_legacy_role(role);
    generate_jwt(&claims, TEST_SECRET).expect("token")
}

pub fn member_token(user_id: &str, tenant: &TenantContext, role: OrganizationRole) -> String {
    let claims = Claims::new(user_id, format!("user{}", user_id), 1).with_organization(tenant, role);
    generate_jwt(&claims, TEST_SECRET).expect("token")
}

pub fn global_admin_token(user_id: &str) -> String {
    let claims = Claims::new(user_id, "root", 1).with_global_role(GlobalRole::GlobalAdmin);
    generate_jwt(&claims, TEST_SECRET).expect("token")
}

/// Call the router in-process and decode the JSON body.
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = router.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    (status, json)
}

pub fn router(state: &AppState) -> Router {
    app(state.clone())
}
