//! Request context: the Principal produced by the auth middleware, and the
//! Tenant Guard extractors built on it.
//!
//! Guards run as `FromRequestParts` extractors, so they are evaluated before
//! any request body is read.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crm_auth::{Principal, TenantScope, require_membership, require_tenant_admin};

use crate::app::errors::ApiError;

fn principal(parts: &Parts) -> Result<&Principal, ApiError> {
    parts
        .extensions
        .get::<Principal>()
        .ok_or_else(|| ApiError::unauthenticated("missing principal"))
}

/// Caller belongs to an organization.
#[derive(Debug, Clone)]
pub struct TenantMember(pub TenantScope);

/// Caller belongs to an organization and holds the admin role.
#[derive(Debug, Clone)]
pub struct TenantAdmin(pub TenantScope);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for TenantMember {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(require_membership(principal(parts)?)?))
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for TenantAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(require_tenant_admin(principal(parts)?)?))
    }
}
