//! What a bootstrap creates: one organization plus the directory row that
//! binds the caller to it.
//!
//! Storage and identity checks live in the infra layer; this module only
//! decides names and roles.

use crm_core::{DomainResult, SubjectId};

use crate::{DirectoryUser, Identity, Organization, Role};

/// An organization and its first member, created together or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningPlan {
    pub organization: Organization,
    pub user: DirectoryUser,
}

impl ProvisioningPlan {
    /// Lazy first access: a private organization named after the email's
    /// local part, the caller as a plain `user`.
    pub fn lazy(identity: &Identity) -> Self {
        let local = display_name(identity);
        let organization = Organization {
            id: crm_core::OrganizationId::new(),
            name: default_organization_name(&local),
            created_at: chrono::Utc::now(),
        };
        let user = DirectoryUser::new(
            identity.subject.clone(),
            identity.email.clone(),
            Some(local),
            Role::User,
            Some(organization.id),
        );
        Self { organization, user }
    }

    /// Explicit creation: a named organization owned by the caller as `admin`.
    pub fn owner(
        subject: SubjectId,
        email: impl Into<String>,
        full_name: Option<String>,
        organization_name: impl Into<String>,
    ) -> DomainResult<Self> {
        let organization = Organization::new(organization_name)?;
        let user = DirectoryUser::new(
            subject,
            email,
            full_name,
            Role::Admin,
            Some(organization.id),
        );
        Ok(Self { organization, user })
    }
}

/// Part of an email address before the `@` (the whole string if there is none).
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or_default()
}

/// `"<name>'s Org"`.
pub fn default_organization_name(name: &str) -> String {
    format!("{name}'s Org")
}

// Falls back to the subject when the token carried no usable email.
fn display_name(identity: &Identity) -> String {
    let local = email_local_part(identity.email.trim());
    if local.is_empty() {
        identity.subject.to_string()
    } else {
        local.to_string()
    }
}
