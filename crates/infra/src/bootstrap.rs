//! Bootstrap protocol: first-use provisioning of an organization and the
//! directory row that binds a subject to it.
//!
//! Every path is idempotent and race-tolerant. The directory's primary key
//! on the subject decides races; the loser re-reads the winner's row instead
//! of failing, and nothing it created is left behind.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use crm_auth::{DirectoryUser, Identity, Organization, Principal, ProvisioningPlan, Role};
use crm_core::{DomainError, SubjectId};

use crate::directory::TenantDirectory;
use crate::error::StoreError;
use crate::identity::{IdentityError, IdentityProvider};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("identity {0} does not exist")]
    UnknownIdentity(SubjectId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Explicit signup: a new identity creates and owns a named organization.
#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub subject: SubjectId,
    pub email: String,
    pub full_name: Option<String>,
    pub organization_name: String,
}

/// Whether a directory row was created by this call or already existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    Created(DirectoryUser),
    Existing(DirectoryUser),
}

impl Profile {
    pub fn user(&self) -> &DirectoryUser {
        match self {
            Profile::Created(user) | Profile::Existing(user) => user,
        }
    }
}

#[derive(Clone)]
pub struct Bootstrapper {
    directory: Arc<dyn TenantDirectory>,
    identities: Arc<dyn IdentityProvider>,
}

impl Bootstrapper {
    pub fn new(directory: Arc<dyn TenantDirectory>, identities: Arc<dyn IdentityProvider>) -> Self {
        Self { directory, identities }
    }

    /// Explicit signup.
    ///
    /// The subject must exist at the identity provider. A subject that is
    /// already bound to an organization gets `AlreadyProvisioned`; one with an
    /// unaffiliated directory row is bound to the new organization as admin.
    #[instrument(skip(self, request), fields(subject = %request.subject), err)]
    pub async fn signup(&self, request: SignupRequest) -> Result<ProvisioningPlan, BootstrapError> {
        let plan = ProvisioningPlan::owner(
            request.subject.clone(),
            request.email,
            request.full_name,
            request.organization_name,
        )?;

        let identity = self
            .identities
            .get_identity(&request.subject)
            .await?
            .ok_or_else(|| BootstrapError::UnknownIdentity(request.subject.clone()))?;

        let mut plan = plan;
        if plan.user.email.trim().is_empty() {
            plan.user.email = identity.email;
        }

        self.provision_owner(plan).await
    }

    /// Lazy first access: return the caller's row, creating a private
    /// organization and a `user` row for them if none exists.
    #[instrument(skip(self, identity), fields(subject = %identity.subject), err)]
    pub async fn ensure_user(&self, identity: &Identity) -> Result<DirectoryUser, BootstrapError> {
        if let Some(existing) = self.directory.find_user(&identity.subject).await? {
            return Ok(existing);
        }

        match self.directory.provision(ProvisioningPlan::lazy(identity)).await {
            Ok(plan) => {
                info!(
                    organization_id = %plan.organization.id,
                    organization = %plan.organization.name,
                    "provisioned organization on first access"
                );
                Ok(plan.user)
            }
            Err(e) if e.is_conflict() => {
                // A concurrent request won; its row is the answer.
                self.directory
                    .find_user(&identity.subject)
                    .await?
                    .ok_or(BootstrapError::Store(e))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Create an organization owned by the caller (`POST /api/organizations`).
    ///
    /// A caller without a directory row gets one, built from the principal.
    #[instrument(skip(self, principal, name), fields(subject = %principal.id), err)]
    pub async fn create_organization(
        &self,
        principal: &Principal,
        name: &str,
    ) -> Result<Organization, BootstrapError> {
        if principal.organization_id.is_some() {
            return Err(already_provisioned(&principal.id).into());
        }
        let plan = ProvisioningPlan::owner(
            principal.id.clone(),
            principal.email.clone(),
            principal.full_name.clone(),
            name,
        )?;
        Ok(self.provision_owner(plan).await?.organization)
    }

    /// Create the caller's own directory row without an organization.
    #[instrument(skip(self, email, full_name), fields(subject = %subject), err)]
    pub async fn create_profile(
        &self,
        subject: &SubjectId,
        email: &str,
        full_name: Option<String>,
    ) -> Result<Profile, BootstrapError> {
        if let Some(existing) = self.directory.find_user(subject).await? {
            return Ok(Profile::Existing(existing));
        }
        if email.trim().is_empty() {
            return Err(DomainError::validation("email is required").into());
        }

        let row = DirectoryUser::new(subject.clone(), email, full_name, Role::User, None);
        match self.directory.insert_user(row).await {
            Ok(created) => Ok(Profile::Created(created)),
            Err(e) if e.is_conflict() => self
                .directory
                .find_user(subject)
                .await?
                .map(Profile::Existing)
                .ok_or(BootstrapError::Store(e)),
            Err(e) => Err(e.into()),
        }
    }

    /// Provision an admin-owned organization, falling back to binding an
    /// existing unaffiliated row when the subject already has one.
    async fn provision_owner(&self, plan: ProvisioningPlan) -> Result<ProvisioningPlan, BootstrapError> {
        let subject = plan.user.id.clone();
        let organization = plan.organization.clone();

        match self.directory.provision(plan).await {
            Ok(plan) => {
                info!(
                    subject = %subject,
                    organization_id = %plan.organization.id,
                    "provisioned organization"
                );
                Ok(plan)
            }
            Err(e) if e.is_conflict() => {
                match self
                    .directory
                    .attach_organization(&subject, organization.clone(), Role::Admin)
                    .await?
                {
                    Some(user) => {
                        info!(
                            subject = %subject,
                            organization_id = %organization.id,
                            "bound existing directory row to new organization"
                        );
                        Ok(ProvisioningPlan { organization, user })
                    }
                    None => Err(already_provisioned(&subject).into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn already_provisioned(subject: &SubjectId) -> DomainError {
    DomainError::already_provisioned(format!("user {subject} already belongs to an organization"))
}
