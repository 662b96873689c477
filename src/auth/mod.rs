//! Session tokens.
//!
//! Sessions arrive as HS256 JWTs. The claims are trusted as issued: the
//! signature is the boundary, and no claim is re-checked against storage on
//! each request.

pub mod permissions;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::tenant::TenantContext;
use permissions::{GlobalRole, LegacyRole, OrganizationRole};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User id, integer or UUID rendered as text
    pub sub: String,
    pub username: String,
    /// Legacy flat role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<LegacyRole>,
    #[serde(default)]
    pub global_role: GlobalRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_role: Option<OrganizationRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_name: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: impl Into<String>, username: impl Into<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: sub.into(),
            username: username.into(),
            role: None,
            global_role: GlobalRole::None,
            organization_role: None,
            tenant_id: None,
            tenant_slug: None,
            tenant_name: None,
            exp,
            iat: now.timestamp(),
        }
    }

    pub fn with_legacy_role(mut self, role: LegacyRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_global_role(mut self, role: GlobalRole) -> Self {
        self.global_role = role;
        self
    }

    pub fn with_organization(mut self, tenant: &TenantContext, role: OrganizationRole) -> Self {
        self.organization_role = Some(role);
        self.tenant_id = Some(tenant.tenant_id);
        self.tenant_slug = Some(tenant.tenant_slug.clone());
        self.tenant_name = Some(tenant.tenant_name.clone());
        self
    }
}

/// Authenticated caller, as decoded from a verified token
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub legacy_role: Option<LegacyRole>,
    pub global_role: GlobalRole,
    pub organization_role: Option<OrganizationRole>,
    pub tenant_id: Option<Uuid>,
    pub tenant_slug: Option<String>,
    pub tenant_name: Option<String>,
}

impl Session {
    /// Tenant carried by the token, if the user is bound to one.
    pub fn bound_tenant(&self) -> Option<TenantContext> {
        let tenant_id = self.tenant_id?;
        Some(TenantContext {
            tenant_id,
            tenant_slug: self.tenant_slug.clone().unwrap_or_default(),
            tenant_name: self.tenant_name.clone().unwrap_or_default(),
        })
    }
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            legacy_role: claims.role,
            global_role: claims.global_role,
            organization_role: claims.organization_role,
            tenant_id: claims.tenant_id,
            tenant_slug: claims.tenant_slug,
            tenant_name: claims.tenant_name,
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("JWT secret not configured")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}
