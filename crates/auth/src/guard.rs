//! Tenant Guard: membership and role predicates.
//!
//! - No IO
//! - No panics
//! - Pure functions of the [`Principal`]; the directory is never consulted

use thiserror::Error;

use crm_core::{OrganizationId, SubjectId};

use crate::{Principal, Role};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GuardError {
    #[error("no organization")]
    NoOrganization,

    #[error("admin required")]
    AdminRequired,
}

/// Tenant binding of a principal that passed the membership check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope {
    pub organization_id: OrganizationId,
    pub subject: SubjectId,
    pub role: Role,
}

/// Fails unless the principal belongs to an organization.
pub fn require_membership(principal: &Principal) -> Result<TenantScope, GuardError> {
    let organization_id = principal.organization_id.ok_or(GuardError::NoOrganization)?;
    Ok(TenantScope {
        organization_id,
        subject: principal.id.clone(),
        role: principal.role,
    })
}

/// Fails unless the principal holds the admin role.
pub fn require_admin(principal: &Principal) -> Result<(), GuardError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(GuardError::AdminRequired)
    }
}

/// Membership, then role.
pub fn require_tenant_admin(principal: &Principal) -> Result<TenantScope, GuardError> {
    let scope = require_membership(principal)?;
    require_admin(principal)?;
    Ok(scope)
}
