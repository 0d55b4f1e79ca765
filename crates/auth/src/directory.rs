//! Tenant Directory rows: organizations and the users bound to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crm_core::{DomainError, DomainResult, OrganizationId, SubjectId};

use crate::Role;

/// A tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("organization name is required"));
        }
        Ok(Self {
            id: OrganizationId::new(),
            name,
            created_at: Utc::now(),
        })
    }
}

/// Directory row of an authenticated identity.
///
/// `id` is the identity provider's subject, which makes the join between an
/// identity and its directory row 1:1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: SubjectId,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub organization_id: Option<OrganizationId>,
    pub created_at: DateTime<Utc>,
}

impl DirectoryUser {
    pub fn new(
        id: SubjectId,
        email: impl Into<String>,
        full_name: Option<String>,
        role: Role,
        organization_id: Option<OrganizationId>,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            full_name,
            role,
            organization_id,
            created_at: Utc::now(),
        }
    }
}

/// Admin-initiated change to another member: only supplied fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUserPatch {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl DirectoryUserPatch {
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.full_name.is_none()
    }

    pub fn apply(&self, user: &mut DirectoryUser) {
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(full_name) = &self.full_name {
            user.full_name = Some(full_name.clone());
        }
    }
}
