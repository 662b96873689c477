//! Idempotent DDL for both engines.
//!
//! Tenant rows are never cascaded: removing or deactivating a tenant leaves its
//! scoped rows in place until an operator deals with them.

use tracing::info;

use super::backend::{Backend, BackendKind};
use super::error::DatabaseError;
use super::value::SqlValue;
use crate::tenant::{DEFAULT_TENANT_ID, DEFAULT_TENANT_NAME, DEFAULT_TENANT_SLUG};

const LEGACY_SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT,
        firstname TEXT,
        lastname TEXT,
        password_hash TEXT,
        role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'manager', 'admin')),
        favorite_team_id INTEGER,
        favorite_player_id INTEGER,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS manufacturers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS teams (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        city TEXT,
        sport TEXT,
        league TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS players (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        firstname TEXT NOT NULL,
        lastname TEXT NOT NULL,
        team_id INTEGER REFERENCES teams(id),
        position TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS cards (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        year INTEGER NOT NULL,
        set_name TEXT,
        card_number TEXT,
        card_condition TEXT,
        notes TEXT,
        image_front TEXT,
        image_back TEXT,
        player_id INTEGER REFERENCES players(id),
        team_id INTEGER REFERENCES teams(id),
        manufacturer_id INTEGER REFERENCES manufacturers(id),
        is_rookie BOOLEAN DEFAULT 0,
        grade REAL,
        purchase_price REAL,
        current_value REAL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
];

const MULTI_TENANT_SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS tenants (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        subscription_tier TEXT NOT NULL DEFAULT 'free',
        max_users BIGINT NOT NULL DEFAULT 5,
        status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'suspended', 'inactive')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        username TEXT NOT NULL UNIQUE,
        email TEXT,
        firstname TEXT,
        lastname TEXT,
        password_hash TEXT,
        global_role TEXT NOT NULL DEFAULT 'none'
            CHECK (global_role IN ('none', 'global_operator', 'global_admin')),
        organization_role TEXT CHECK (organization_role IN ('user', 'org_admin')),
        tenant_id UUID REFERENCES tenants(id),
        favorite_team_id UUID,
        favorite_player_id UUID,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT users_tenant_binding CHECK (tenant_id IS NOT NULL OR global_role = 'global_admin')
    )"#,
    r#"CREATE TABLE IF NOT EXISTS manufacturers (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        tenant_id UUID NOT NULL REFERENCES tenants(id),
        name TEXT NOT NULL,
        description TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS teams (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        tenant_id UUID NOT NULL REFERENCES tenants(id),
        name TEXT NOT NULL,
        city TEXT,
        sport TEXT,
        league TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS players (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        tenant_id UUID NOT NULL REFERENCES tenants(id),
        firstname TEXT NOT NULL,
        lastname TEXT NOT NULL,
        team_id UUID REFERENCES teams(id),
        position TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS cards (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        tenant_id UUID NOT NULL REFERENCES tenants(id),
        year BIGINT NOT NULL,
        set_name TEXT,
        card_number TEXT,
        card_condition TEXT,
        notes TEXT,
        image_front TEXT,
        image_back TEXT,
        player_id UUID REFERENCES players(id),
        team_id UUID REFERENCES teams(id),
        manufacturer_id UUID REFERENCES manufacturers(id),
        is_rookie BOOLEAN DEFAULT false,
        grade DOUBLE PRECISION,
        purchase_price DOUBLE PRECISION,
        current_value DOUBLE PRECISION,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_users_tenant ON users (tenant_id)",
    "CREATE INDEX IF NOT EXISTS idx_manufacturers_tenant ON manufacturers (tenant_id)",
    "CREATE INDEX IF NOT EXISTS idx_teams_tenant ON teams (tenant_id)",
    "CREATE INDEX IF NOT EXISTS idx_players_tenant ON players (tenant_id)",
    "CREATE INDEX IF NOT EXISTS idx_cards_tenant ON cards (tenant_id)",
];

/// Create missing tables for the active engine and seed the default tenant.
pub async fn bootstrap(backend: &dyn Backend) -> Result<(), DatabaseError> {
    let statements = match backend.kind() {
        BackendKind::Legacy => LEGACY_SCHEMA,
        BackendKind::MultiTenant => MULTI_TENANT_SCHEMA,
    };
    for statement in statements {
        backend.run(statement, &[]).await?;
    }

    if backend.kind().is_multi_tenant() {
        let mut q = backend.query();
        q.push("INSERT INTO tenants (id, name, slug, subscription_tier, max_users, status) VALUES (")
            .bind(SqlValue::Uuid(DEFAULT_TENANT_ID))
            .push(", ")
            .bind(SqlValue::text(DEFAULT_TENANT_NAME))
            .push(", ")
            .bind(SqlValue::text(DEFAULT_TENANT_SLUG))
            .push(", 'free', 1000, 'active') ON CONFLICT (id) DO NOTHING");
        let seeded = backend.run(q.sql(), q.params()).await?;
        if seeded.changes > 0 {
            info!("Seeded default tenant '{}'", DEFAULT_TENANT_SLUG);
        }
    }

    info!("Schema ready for {} backend", backend.kind());
    Ok(())
}
