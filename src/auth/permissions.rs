//! Role model and the permission evaluator.
//!
//! Everything here is a pure function of its inputs so that route guards and
//! client-side gating reach the same answer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::Session;
use crate::database::BackendKind;

/// Deployment-wide role, independent of any tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalRole {
    #[default]
    None,
    GlobalOperator,
    GlobalAdmin,
}

/// Role within a single tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationRole {
    User,
    OrgAdmin,
}

/// Flat role of the single-tenant deployment, ordered `User < Manager < Admin`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyRole {
    #[default]
    User,
    Manager,
    Admin,
}

impl GlobalRole {
    pub fn as_str(self) -> &'static str {
        match self {
            GlobalRole::None => "none",
            GlobalRole::GlobalOperator => "global_operator",
            GlobalRole::GlobalAdmin => "global_admin",
        }
    }
}

impl OrganizationRole {
    pub fn as_str(self) -> &'static str {
        match self {
            OrganizationRole::User => "user",
            OrganizationRole::OrgAdmin => "org_admin",
        }
    }
}

impl LegacyRole {
    pub fn as_str(self) -> &'static str {
        match self {
            LegacyRole::User => "user",
            LegacyRole::Manager => "manager",
            LegacyRole::Admin => "admin",
        }
    }
}

impl FromStr for OrganizationRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(OrganizationRole::User),
            "org_admin" => Ok(OrganizationRole::OrgAdmin),
            other => Err(format!("unknown organization role: {}", other)),
        }
    }
}

impl FromStr for LegacyRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(LegacyRole::User),
            "manager" => Ok(LegacyRole::Manager),
            "admin" => Ok(LegacyRole::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl FromStr for GlobalRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(GlobalRole::None),
            "global_operator" => Ok(GlobalRole::GlobalOperator),
            "global_admin" => Ok(GlobalRole::GlobalAdmin),
            other => Err(format!("unknown global role: {}", other)),
        }
    }
}

pub fn is_global_admin(global: GlobalRole) -> bool {
    global == GlobalRole::GlobalAdmin
}

pub fn is_global_operator(global: GlobalRole) -> bool {
    global == GlobalRole::GlobalOperator
}

pub fn is_organization_admin(organization: Option<OrganizationRole>) -> bool {
    organization == Some(OrganizationRole::OrgAdmin)
}

pub fn can_switch_tenants(global: GlobalRole) -> bool {
    is_global_admin(global)
}

pub fn can_manage_global_system(global: GlobalRole) -> bool {
    is_global_admin(global)
}

pub fn can_view_global_dashboards(global: GlobalRole) -> bool {
    is_global_admin(global) || is_global_operator(global)
}

pub fn can_manage_organization_users(global: GlobalRole, organization: Option<OrganizationRole>) -> bool {
    is_global_admin(global) || is_organization_admin(organization)
}

/// Card data only exists inside a tenant, so creating it takes an organization
/// role. A global admin without one has nothing to create cards in.
pub fn can_create_cards(_global: GlobalRole, organization: Option<OrganizationRole>) -> bool {
    organization.is_some()
}

pub fn can_modify_records(global: GlobalRole, organization: Option<OrganizationRole>) -> bool {
    can_create_cards(global, organization)
        && (is_organization_admin(organization) || is_global_admin(global))
}

pub fn legacy_can_create(role: LegacyRole) -> bool {
    role >= LegacyRole::User
}

pub fn legacy_can_modify(role: LegacyRole) -> bool {
    role >= LegacyRole::Manager
}

pub fn legacy_can_manage_users(role: LegacyRole) -> bool {
    role >= LegacyRole::Admin
}

/// Something a caller may attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateRecords,
    ModifyRecords,
    ManageOrganizationUsers,
    ManageGlobalSystem,
    SwitchTenants,
    ViewGlobalDashboards,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::CreateRecords => "create records",
            Action::ModifyRecords => "modify records",
            Action::ManageOrganizationUsers => "manage organization users",
            Action::ManageGlobalSystem => "manage the global system",
            Action::SwitchTenants => "switch tenants",
            Action::ViewGlobalDashboards => "view global dashboards",
        };
        f.write_str(name)
    }
}

/// Two-axis decision used by the multi-tenant deployment.
pub fn is_allowed(global: GlobalRole, organization: Option<OrganizationRole>, action: Action) -> bool {
    match action {
        Action::CreateRecords => can_create_cards(global, organization),
        Action::ModifyRecords => can_modify_records(global, organization),
        Action::ManageOrganizationUsers => can_manage_organization_users(global, organization),
        Action::ManageGlobalSystem => can_manage_global_system(global),
        Action::SwitchTenants => can_switch_tenants(global),
        Action::ViewGlobalDashboards => can_view_global_dashboards(global),
    }
}

/// Flat-role decision used by the single-tenant deployment. There are no
/// tenants to switch between; the admin runs the whole installation.
pub fn legacy_is_allowed(role: LegacyRole, action: Action) -> bool {
    match action {
        Action::CreateRecords => legacy_can_create(role),
        Action::ModifyRecords => legacy_can_modify(role),
        Action::ManageOrganizationUsers => legacy_can_manage_users(role),
        Action::ManageGlobalSystem | Action::ViewGlobalDashboards => role == LegacyRole::Admin,
        Action::SwitchTenants => false,
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Permission denied: not allowed to {action}")]
pub struct PermissionDenied {
    pub action: Action,
}

/// Gate an action for a session before any I/O is attempted.
pub fn authorize(session: &Session, action: Action, engine: BackendKind) -> Result<(), PermissionDenied> {
    let allowed = match engine {
        BackendKind::Legacy => legacy_is_allowed(session.legacy_role.unwrap_or_default(), action),
        BackendKind::MultiTenant => is_allowed(session.global_role, session.organization_role, action),
    };
    if allowed {
        Ok(())
    } else {
        tracing::debug!("Denied '{}' for user {}", action, session.user_id);
        Err(PermissionDenied { action })
    }
}
