//! Per-request data access with the tenant scope baked in.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::entity::{Column, ColumnKind, Entity, SYSTEM_COLUMNS};
use crate::auth::permissions::{LegacyRole, OrganizationRole};
use crate::database::models::user::{User, LEGACY_USER_COLUMNS, MULTI_TENANT_USER_COLUMNS};
use crate::database::{
    execute, fetch_all, fetch_one, Backend, BackendKind, DatabaseError, IdKind, RecordId, Row, SqlQuery, SqlType,
    SqlValue,
};
use crate::tenant::TenantContext;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Tenant context required to {0}")]
    MissingTenantContext(String),

    #[error("{entity} {id} belongs to another tenant")]
    TenantScope { entity: &'static str, id: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Field '{0}' is maintained by the system and cannot be written")]
    SystemFieldNotAllowed(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    InvalidId(String),

    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for DataError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::InvalidId(msg) => DataError::InvalidId(msg),
            other => DataError::Database(other),
        }
    }
}

/// Tenant scope of a service instance, fixed when it is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Legacy engine: the tables carry no tenant column
    Unpartitioned,
    /// Multi-tenant engine, working inside one tenant
    Tenant(TenantContext),
    /// Multi-tenant engine with no tenant selected; tenant data is unreachable
    Global,
}

/// Reads and writes cards, teams, players, manufacturers and organization users.
///
/// Under [`Scope::Tenant`] every read filters on `tenant_id` and every insert
/// stamps it. Updates and deletes first locate the target by id alone, refuse
/// rows of other tenants, and then mutate with both the id and the tenant in
/// the WHERE clause. Under [`Scope::Global`] nothing touches storage.
///
/// Built per request from the shared backend; never shared between requests.
#[derive(Debug)]
pub struct ScopedDataService {
    backend: Arc<dyn Backend>,
    scope: Scope,
}

macro_rules! entity_operations {
    ($entity:expr, $get_all:ident, $get_by_id:ident, $create:ident, $update:ident, $delete:ident) => {
        pub async fn $get_all(&self) -> Result<Vec<Row>, DataError> {
            self.list($entity).await
        }

        pub async fn $get_by_id(&self, id: &str) -> Result<Row, DataError> {
            self.find($entity, id).await
        }

        pub async fn $create(&self, input: &Row) -> Result<Row, DataError> {
            self.create($entity, input).await
        }

        pub async fn $update(&self, id: &str, input: &Row) -> Result<Row, DataError> {
            self.update($entity, id, input).await
        }

        pub async fn $delete(&self, id: &str) -> Result<(), DataError> {
            self.delete($entity, id).await
        }
    };
}

impl ScopedDataService {
    pub fn new(backend: Arc<dyn Backend>, context: Option<TenantContext>) -> Self {
        let scope = match (backend.kind(), context) {
            (BackendKind::Legacy, _) => Scope::Unpartitioned,
            (BackendKind::MultiTenant, Some(context)) => Scope::Tenant(context),
            (BackendKind::MultiTenant, None) => Scope::Global,
        };
        Self { backend, scope }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn tenant(&self) -> Option<&TenantContext> {
        match &self.scope {
            Scope::Tenant(context) => Some(context),
            _ => None,
        }
    }

    entity_operations!(Entity::Card, get_all_cards, get_card_by_id, create_card, update_card, delete_card);
    entity_operations!(Entity::Team, get_all_teams, get_team_by_id, create_team, update_team, delete_team);
    entity_operations!(Entity::Player, get_all_players, get_player_by_id, create_player, update_player, delete_player);
    entity_operations!(
        Entity::Manufacturer,
        get_all_manufacturers,
        get_manufacturer_by_id,
        create_manufacturer,
        update_manufacturer,
        delete_manufacturer
    );

    pub async fn list(&self, entity: Entity) -> Result<Vec<Row>, DataError> {
        let tenant = self.tenant_filter(|| format!("list {}", entity.table()))?;

        let mut q = self.backend.query();
        q.push("SELECT * FROM ").push_ident(entity.table());
        if let Some(tenant_id) = tenant {
            q.push(" WHERE ").push_eq("tenant_id", SqlValue::Uuid(tenant_id));
        }
        q.push(" ORDER BY created_at, id");

        Ok(fetch_all(self.backend.as_ref(), &q).await?)
    }

    /// A row outside the scope is reported as missing.
    pub async fn find(&self, entity: Entity, id: &str) -> Result<Row, DataError> {
        let tenant = self.tenant_filter(|| format!("read a {}", entity))?;
        let id = self.parse_id(id)?;

        self.fetch_scoped(entity, &id, tenant)
            .await?
            .ok_or_else(|| not_found(entity.name(), &id))
    }

    pub async fn create(&self, entity: Entity, input: &Row) -> Result<Row, DataError> {
        let tenant = self.tenant_filter(|| format!("create a {}", entity))?;
        let mut values = self.prepare(entity, input, true)?;
        self.check_references(entity, &values, tenant).await?;

        if let Some(tenant_id) = tenant {
            values.insert(0, ("tenant_id", SqlValue::Uuid(tenant_id)));
        }

        let mut q = self.backend.query();
        q.push("INSERT INTO ").push_ident(entity.table()).push(" (");
        for (i, (column, _)) in values.iter().enumerate() {
            if i > 0 {
                q.push(", ");
            }
            q.push_ident(column);
        }
        q.push(") VALUES (");
        for (i, (_, value)) in values.into_iter().enumerate() {
            if i > 0 {
                q.push(", ");
            }
            q.bind(value);
        }
        q.push(")");

        let id = execute(self.backend.as_ref(), &q)
            .await?
            .id
            .ok_or_else(|| DataError::Database(DatabaseError::QueryError(format!("insert into {} returned no id", entity.table()))))?;
        info!("Created {} {}", entity, id);

        self.fetch_scoped(entity, &id, tenant)
            .await?
            .ok_or_else(|| not_found(entity.name(), &id))
    }

    pub async fn update(&self, entity: Entity, id: &str, input: &Row) -> Result<Row, DataError> {
        let tenant = self.tenant_filter(|| format!("update a {}", entity))?;
        let id = self.parse_id(id)?;
        let values = self.prepare(entity, input, false)?;

        self.probe(entity.table(), entity.name(), &id, tenant).await?;
        self.check_references(entity, &values, tenant).await?;

        let mut q = self.backend.query();
        q.push("UPDATE ").push_ident(entity.table()).push(" SET ");
        for (column, value) in values {
            q.push_eq(column, value).push(", ");
        }
        q.push("updated_at = CURRENT_TIMESTAMP WHERE ").push_eq("id", SqlValue::from(&id));
        push_tenant_clause(&mut q, tenant);

        if execute(self.backend.as_ref(), &q).await?.changes == 0 {
            return Err(not_found(entity.name(), &id));
        }
        info!("Updated {} {}", entity, id);

        self.fetch_scoped(entity, &id, tenant)
            .await?
            .ok_or_else(|| not_found(entity.name(), &id))
    }

    pub async fn delete(&self, entity: Entity, id: &str) -> Result<(), DataError> {
        let tenant = self.tenant_filter(|| format!("delete a {}", entity))?;
        let id = self.parse_id(id)?;

        self.probe(entity.table(), entity.name(), &id, tenant).await?;

        let mut q = self.backend.query();
        q.push("DELETE FROM ")
            .push_ident(entity.table())
            .push(" WHERE ")
            .push_eq("id", SqlValue::from(&id));
        push_tenant_clause(&mut q, tenant);

        if execute(self.backend.as_ref(), &q).await?.changes == 0 {
            return Err(not_found(entity.name(), &id));
        }
        info!("Deleted {} {}", entity, id);
        Ok(())
    }

    /// Users of the current scope. Password hashes are never selected.
    pub async fn get_users(&self) -> Result<Vec<User>, DataError> {
        let tenant = self.tenant_filter(|| "list users".to_string())?;

        let mut q = self.backend.query();
        q.push("SELECT ").push(&self.user_columns()).push(" FROM users");
        if let Some(tenant_id) = tenant {
            q.push(" WHERE ").push_eq("tenant_id", SqlValue::Uuid(tenant_id));
        }
        q.push(" ORDER BY username");

        let rows = fetch_all(self.backend.as_ref(), &q).await?;
        Ok(rows.into_iter().map(User::try_from).collect::<Result<_, _>>()?)
    }

    /// Set a user's organization role, or the flat role under the legacy engine.
    pub async fn set_user_role(&self, id: &str, role: &str) -> Result<User, DataError> {
        let tenant = self.tenant_filter(|| "change user roles".to_string())?;
        let id = self.parse_id(id)?;
        let (column, role) = match self.backend.kind() {
            BackendKind::Legacy => ("role", role.parse::<LegacyRole>().map_err(DataError::Validation)?.as_str()),
            BackendKind::MultiTenant => (
                "organization_role",
                role.parse::<OrganizationRole>().map_err(DataError::Validation)?.as_str(),
            ),
        };

        self.probe("users", "user", &id, tenant).await?;

        let mut q = self.backend.query();
        q.push("UPDATE users SET ")
            .push_eq(column, SqlValue::text(role))
            .push(", updated_at = CURRENT_TIMESTAMP WHERE ")
            .push_eq("id", SqlValue::from(&id));
        push_tenant_clause(&mut q, tenant);
        if execute(self.backend.as_ref(), &q).await?.changes == 0 {
            return Err(not_found("user", &id));
        }
        info!(target: "audit", "User {} now has {} '{}'", id, column, role);

        let mut q = self.backend.query();
        q.push("SELECT ")
            .push(&self.user_columns())
            .push(" FROM users WHERE ")
            .push_eq("id", SqlValue::from(&id));
        push_tenant_clause(&mut q, tenant);
        let row = fetch_one(self.backend.as_ref(), &q)
            .await?
            .ok_or_else(|| not_found("user", &id))?;
        Ok(User::try_from(row)?)
    }

    fn user_columns(&self) -> String {
        match self.backend.kind() {
            BackendKind::Legacy => LEGACY_USER_COLUMNS.join(", "),
            BackendKind::MultiTenant => MULTI_TENANT_USER_COLUMNS.join(", "),
        }
    }

    /// Tenant id to filter on, or `None` when the engine is unpartitioned.
    fn tenant_filter(&self, action: impl FnOnce() -> String) -> Result<Option<Uuid>, DataError> {
        match &self.scope {
            Scope::Unpartitioned => Ok(None),
            Scope::Tenant(context) => Ok(Some(context.tenant_id)),
            Scope::Global => Err(DataError::MissingTenantContext(action())),
        }
    }

    fn parse_id(&self, raw: &str) -> Result<RecordId, DataError> {
        Ok(self.backend.id_kind().parse(raw)?)
    }

    async fn fetch_scoped(&self, entity: Entity, id: &RecordId, tenant: Option<Uuid>) -> Result<Option<Row>, DataError> {
        let mut q = self.backend.query();
        q.push("SELECT * FROM ")
            .push_ident(entity.table())
            .push(" WHERE ")
            .push_eq("id", SqlValue::from(id));
        push_tenant_clause(&mut q, tenant);
        Ok(fetch_one(self.backend.as_ref(), &q).await?)
    }

    /// Find a row by id alone and check it against the scope.
    ///
    /// This is the one read of a scoped table that runs without a tenant
    /// filter, so it is written to the audit log.
    async fn probe(&self, table: &'static str, label: &'static str, id: &RecordId, tenant: Option<Uuid>) -> Result<(), DataError> {
        let mut q = self.backend.query();
        let Some(tenant_id) = tenant else {
            q.push("SELECT id FROM ").push_ident(table).push(" WHERE ").push_eq("id", SqlValue::from(id));
            return match fetch_one(self.backend.as_ref(), &q).await? {
                Some(_) => Ok(()),
                None => Err(not_found(label, id)),
            };
        };

        debug!(target: "audit", "Unscoped lookup of {} {} on behalf of tenant {}", label, id, tenant_id);
        q.push("SELECT tenant_id FROM ")
            .push_ident(table)
            .push(" WHERE ")
            .push_eq("id", SqlValue::from(id));
        let row = fetch_one(self.backend.as_ref(), &q)
            .await?
            .ok_or_else(|| not_found(label, id))?;

        let owner = row
            .get("tenant_id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok());
        if owner == Some(tenant_id) {
            return Ok(());
        }

        warn!(
            target: "audit",
            "Cross-tenant access denied: {} {} belongs to {:?}, requested from tenant {}",
            label, id, owner, tenant_id
        );
        Err(DataError::TenantScope { entity: label, id: id.to_string() })
    }

    async fn check_references(
        &self,
        entity: Entity,
        values: &[(&'static str, SqlValue)],
        tenant: Option<Uuid>,
    ) -> Result<(), DataError> {
        for (column, value) in values {
            let Some(ColumnKind::Ref(target)) = entity.column(column).map(|c| c.kind) else {
                continue;
            };
            let id = match value {
                SqlValue::Int(i) => RecordId::Int(*i),
                SqlValue::Uuid(u) => RecordId::Uuid(*u),
                _ => continue,
            };
            match self.probe(target.table(), target.name(), &id, tenant).await {
                Err(DataError::NotFound { .. }) => {
                    return Err(DataError::Validation(format!("{} references a missing {}", column, target)));
                }
                other => other?,
            }
        }
        Ok(())
    }

    /// Check an input object against the entity's columns and convert it to
    /// bind values, in column order.
    fn prepare(&self, entity: Entity, input: &Row, creating: bool) -> Result<Vec<(&'static str, SqlValue)>, DataError> {
        for key in input.keys() {
            if SYSTEM_COLUMNS.contains(&key.as_str()) {
                return Err(DataError::SystemFieldNotAllowed(key.clone()));
            }
            if entity.column(key).is_none() {
                return Err(DataError::Validation(format!("unknown field '{}' for {}", key, entity)));
            }
        }

        let id_kind = self.backend.id_kind();
        let mut values = Vec::new();
        for column in entity.columns() {
            match input.get(column.name) {
                None if creating && column.required => {
                    return Err(DataError::Validation(format!("{} is required", column.name)));
                }
                None => {}
                Some(Value::Null) if column.required => {
                    return Err(DataError::Validation(format!("{} cannot be null", column.name)));
                }
                Some(value) => values.push((column.name, convert(column, value, id_kind)?)),
            }
        }

        if values.is_empty() {
            return Err(DataError::Validation(format!("no fields to update for {}", entity)));
        }
        Ok(values)
    }
}

fn push_tenant_clause(q: &mut SqlQuery, tenant: Option<Uuid>) {
    if let Some(tenant_id) = tenant {
        q.push(" AND ").push_eq("tenant_id", SqlValue::Uuid(tenant_id));
    }
}

fn not_found(label: &'static str, id: &RecordId) -> DataError {
    DataError::NotFound { entity: label, id: id.to_string() }
}

fn convert(column: &Column, value: &Value, id_kind: IdKind) -> Result<SqlValue, DataError> {
    if value.is_null() {
        let ty = match column.kind {
            ColumnKind::Text => SqlType::Text,
            ColumnKind::Integer => SqlType::Int,
            ColumnKind::Real => SqlType::Float,
            ColumnKind::Bool => SqlType::Bool,
            ColumnKind::Ref(_) => id_kind.sql_type(),
        };
        return Ok(SqlValue::Null(ty));
    }

    let converted = match (column.kind, value) {
        (ColumnKind::Text, Value::String(s)) => Some(SqlValue::Text(s.clone())),
        (ColumnKind::Integer, Value::Number(n)) => n.as_i64().map(SqlValue::Int),
        (ColumnKind::Real, Value::Number(n)) => n.as_f64().map(SqlValue::Float),
        (ColumnKind::Bool, Value::Bool(b)) => Some(SqlValue::Bool(*b)),
        (ColumnKind::Bool, Value::Number(n)) => match n.as_i64() {
            Some(0) => Some(SqlValue::Bool(false)),
            Some(1) => Some(SqlValue::Bool(true)),
            _ => None,
        },
        (ColumnKind::Ref(_), v) => id_kind.from_json(v).map(|id| SqlValue::from(&id)),
        _ => None,
    };
    converted.ok_or_else(|| DataError::Validation(format!("invalid value for {}: {}", column.name, value)))
}
