//! Tenant Directory: organizations and the users bound to them.
//!
//! Lookups distinguish "absent" (`Ok(None)`) from "the store could not
//! answer" (`Err`). Provisioning writes are atomic: an organization is only
//! ever created together with the directory row that references it.

use crm_auth::{DirectoryUser, DirectoryUserPatch, Organization, ProvisioningPlan, Role};
use crm_core::{OrganizationId, SubjectId};

use crate::error::StoreError;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryTenantDirectory;
pub use postgres::PostgresTenantDirectory;

#[async_trait::async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn find_user(&self, id: &SubjectId) -> Result<Option<DirectoryUser>, StoreError>;

    /// Members of an organization, oldest first.
    async fn list_users(&self, organization_id: OrganizationId) -> Result<Vec<DirectoryUser>, StoreError>;

    /// Insert a row. A second row for the same subject is a `Conflict`.
    async fn insert_user(&self, user: DirectoryUser) -> Result<DirectoryUser, StoreError>;

    /// Merge-update a member of `organization_id`; `None` if no such member.
    async fn update_user(
        &self,
        organization_id: OrganizationId,
        id: &SubjectId,
        patch: &DirectoryUserPatch,
    ) -> Result<Option<DirectoryUser>, StoreError>;

    /// `false` if `id` is not a member of `organization_id`.
    async fn delete_user(&self, organization_id: OrganizationId, id: &SubjectId) -> Result<bool, StoreError>;

    async fn find_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError>;

    async fn rename_organization(
        &self,
        id: OrganizationId,
        name: &str,
    ) -> Result<Option<Organization>, StoreError>;

    /// Create the organization and its first member in one unit of work.
    ///
    /// Fails with `Conflict` (and creates nothing) if the subject already has
    /// a directory row.
    async fn provision(&self, plan: ProvisioningPlan) -> Result<ProvisioningPlan, StoreError>;

    /// Create `organization` and bind an existing, unaffiliated row to it with
    /// `role`, in one unit of work.
    ///
    /// Returns `None` (and creates nothing) when the subject has no row or is
    /// already bound to an organization.
    async fn attach_organization(
        &self,
        id: &SubjectId,
        organization: Organization,
        role: Role,
    ) -> Result<Option<DirectoryUser>, StoreError>;
}
