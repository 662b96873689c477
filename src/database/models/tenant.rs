use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::database::{DatabaseError, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
    Inactive,
}

impl TenantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
            TenantStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TenantStatus::Active),
            "suspended" => Ok(TenantStatus::Suspended),
            "inactive" => Ok(TenantStatus::Inactive),
            other => Err(format!("unknown tenant status: {}", other)),
        }
    }
}

/// An organization partition of the multi-tenant deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub subscription_tier: String,
    pub max_users: i64,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

impl TryFrom<Row> for Tenant {
    type Error = DatabaseError;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        serde_json::from_value(row.into())
            .map_err(|e| DatabaseError::QueryError(format!("malformed tenant row: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_from_a_backend_row() {
        let row = json!({
            "id": "00000000-0000-0000-0000-000000000001",
            "name": "Default",
            "slug": "default",
            "subscription_tier": "free",
            "max_users": 1000,
            "status": "active",
            "created_at": "2024-05-01T12:00:00+00:00"
        });
        let tenant = Tenant::try_from(row.as_object().cloned().unwrap()).unwrap();
        assert_eq!(tenant.id, Uuid::from_u128(1));
        assert!(tenant.is_active());
    }

    #[test]
    fn rejects_unknown_status() {
        let row = json!({
            "id": "00000000-0000-0000-0000-000000000002",
            "name": "Acme",
            "slug": "acme",
            "subscription_tier": "free",
            "max_users": 5,
            "status": "deleted",
            "created_at": "2024-05-01T12:00:00+00:00"
        });
        assert!(Tenant::try_from(row.as_object().cloned().unwrap()).is_err());
        assert!("deleted".parse::<TenantStatus>().is_err());
    }
}
