use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::permissions::{GlobalRole, LegacyRole, OrganizationRole};
use crate::database::{DatabaseError, RecordId, Row};

/// A user row as exposed to administrators. The password hash is never loaded.
///
/// Legacy rows carry `role`; multi-tenant rows carry the two role axes and
/// `tenant_id`. Timestamps are kept as the engine renders them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<LegacyRole>,
    #[serde(default)]
    pub global_role: GlobalRole,
    #[serde(default)]
    pub organization_role: Option<OrganizationRole>,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub favorite_team_id: Option<RecordId>,
    #[serde(default)]
    pub favorite_player_id: Option<RecordId>,
    pub created_at: String,
    pub updated_at: String,
}

/// Columns selected for [`User`] under each engine.
pub const LEGACY_USER_COLUMNS: &[&str] = &[
    "id",
    "username",
    "email",
    "firstname",
    "lastname",
    "role",
    "favorite_team_id",
    "favorite_player_id",
    "created_at",
    "updated_at",
];

pub const MULTI_TENANT_USER_COLUMNS: &[&str] = &[
    "id",
    "username",
    "email",
    "firstname",
    "lastname",
    "global_role",
    "organization_role",
    "tenant_id",
    "favorite_team_id",
    "favorite_player_id",
    "created_at",
    "updated_at",
];

impl TryFrom<Row> for User {
    type Error = DatabaseError;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        serde_json::from_value(row.into())
            .map_err(|e| DatabaseError::QueryError(format!("malformed user row: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_legacy_rows() {
        let row = json!({
            "id": 7,
            "username": "sam",
            "email": null,
            "firstname": "Sam",
            "lastname": null,
            "role": "manager",
            "favorite_team_id": null,
            "favorite_player_id": null,
            "created_at": "2024-05-01 12:00:00",
            "updated_at": "2024-05-01 12:00:00"
        });
        let user = User::try_from(row.as_object().cloned().unwrap()).unwrap();
        assert_eq!(user.id, RecordId::Int(7));
        assert_eq!(user.role, Some(LegacyRole::Manager));
        assert_eq!(user.global_role, GlobalRole::None);
    }

    #[test]
    fn decodes_multi_tenant_rows() {
        let row = json!({
            "id": "6b8f3c1e-8f1a-4c55-9a39-0a4c1f3b2d10",
            "username": "ada",
            "global_role": "none",
            "organization_role": "org_admin",
            "tenant_id": "00000000-0000-0000-0000-000000000001",
            "created_at": "2024-05-01T12:00:00+00:00",
            "updated_at": "2024-05-01T12:00:00+00:00"
        });
        let user = User::try_from(row.as_object().cloned().unwrap()).unwrap();
        assert!(matches!(user.id, RecordId::Uuid(_)));
        assert_eq!(user.organization_role, Some(OrganizationRole::OrgAdmin));
        assert_eq!(user.tenant_id, Some(Uuid::from_u128(1)));
    }

    #[test]
    fn column_lists_never_include_the_password_hash() {
        assert!(!LEGACY_USER_COLUMNS.contains(&"password_hash"));
        assert!(!MULTI_TENANT_USER_COLUMNS.contains(&"password_hash"));
    }
}
