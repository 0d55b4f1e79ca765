//! Tenant-isolated storage for business records.
//!
//! One implementation serves every [`Resource`]; each operation is scoped by
//! both the organization and the record id, so a record of another tenant is
//! indistinguishable from a missing one.

use crm_core::{FieldFilter, OrganizationId, RecordId, Resource};

use crate::error::StoreError;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;

#[async_trait::async_trait]
pub trait RecordStore<R: Resource>: Send + Sync {
    /// Records of a tenant matching every filter, newest first.
    async fn list(&self, organization_id: OrganizationId, filters: &[FieldFilter]) -> Result<Vec<R>, StoreError>;

    async fn get(&self, organization_id: OrganizationId, id: RecordId) -> Result<Option<R>, StoreError>;

    async fn insert(&self, record: R) -> Result<R, StoreError>;

    /// Merge-patch a record; `None` if it does not exist in this tenant.
    async fn update(
        &self,
        organization_id: OrganizationId,
        id: RecordId,
        patch: &R::Patch,
    ) -> Result<Option<R>, StoreError>;

    /// `false` if the record does not exist in this tenant.
    async fn delete(&self, organization_id: OrganizationId, id: RecordId) -> Result<bool, StoreError>;
}
