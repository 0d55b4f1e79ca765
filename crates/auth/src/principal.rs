use serde::Serialize;

use crm_core::{OrganizationId, SubjectId};

use crate::{DirectoryUser, Identity, Role};

/// The resolved identity + role + tenant binding for the current request.
///
/// Built fresh on every request from the directory row (or from the token
/// alone when no row exists yet); never persisted as such.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: SubjectId,
    pub email: String,
    pub full_name: Option<String>,
    pub organization_id: Option<OrganizationId>,
    pub role: Role,
}

impl Principal {
    /// Principal for an authenticated identity that has no directory row yet.
    pub fn provisional(identity: &Identity) -> Self {
        Self {
            id: identity.subject.clone(),
            email: identity.email.clone(),
            full_name: None,
            organization_id: None,
            role: Role::User,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<DirectoryUser> for Principal {
    fn from(row: DirectoryUser) -> Self {
        Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            organization_id: row.organization_id,
            role: row.role,
        }
    }
}
