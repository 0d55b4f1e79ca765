//! Tenant-scoped business records.
//!
//! Every CRM entity (account, contact, lead, ...) is a `Resource`: a flat,
//! serde-serializable row that embeds a [`RecordMeta`] carrying the fields the
//! server injects (`id`, `organization_id`, `created_by`, `created_at`).
//! Stores and HTTP handlers are written once against this trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{DomainError, DomainResult};
use crate::id::{OrganizationId, RecordId, SubjectId};
use crate::patch;

/// Static description of a resource collection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ResourceKind {
    /// Collection name; doubles as the table name and the URL segment.
    pub collection: &'static str,
    /// Singular, human-readable name used in messages and logs.
    pub label: &'static str,
    /// Whether deleting a record requires the admin role.
    pub delete_requires_admin: bool,
}

/// Server-injected fields shared by every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub id: RecordId,
    pub organization_id: OrganizationId,
    pub created_by: Option<SubjectId>,
    pub created_at: DateTime<Utc>,
}

impl RecordMeta {
    pub fn new(organization_id: OrganizationId, created_by: SubjectId) -> Self {
        Self {
            id: RecordId::new(),
            organization_id,
            created_by: Some(created_by),
            created_at: Utc::now(),
        }
    }
}

/// A tenant-scoped business entity.
pub trait Resource:
    Clone + core::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: ResourceKind;

    /// Create payload (client-supplied fields only).
    type Draft: DeserializeOwned + Send + 'static;

    /// Merge-patch payload: absent fields are left untouched.
    type Patch: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Equality filters accepted by the list operation.
    type Filter: ListFilter;

    /// Validate a draft and build the record around server-injected metadata.
    fn from_draft(meta: RecordMeta, draft: Self::Draft) -> DomainResult<Self>;

    fn meta(&self) -> &RecordMeta;

    fn id(&self) -> RecordId {
        self.meta().id
    }

    fn organization_id(&self) -> OrganizationId {
        self.meta().organization_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.meta().created_at
    }

    /// Field-level rules a stored record must satisfy (required text is not
    /// blank, ...). Checked again after every merge-patch.
    fn validate(&self) -> DomainResult<()> {
        Ok(())
    }

    /// Ids of other records this one points at. Each must resolve inside the
    /// same organization.
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    /// Apply a merge-patch, returning the updated record.
    ///
    /// Only fields present in the patch document change; metadata fields are
    /// never patchable. The result is validated.
    fn patched(&self, patch: &Self::Patch) -> DomainResult<Self> {
        let changes = patch::patch_document(patch)?;
        let mut doc = serde_json::to_value(self)
            .map_err(|e| DomainError::validation(format!("{}: {e}", Self::KIND.label)))?;
        patch::merge(&mut doc, changes);
        let updated: Self = serde_json::from_value(doc)
            .map_err(|e| DomainError::validation(format!("{}: {e}", Self::KIND.label)))?;
        updated.validate()?;
        Ok(updated)
    }
}

/// A record id stored in another record's field (`contact.account_id`, ...).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    /// Collection the id must belong to.
    pub collection: &'static str,
    pub id: RecordId,
}

impl Reference {
    pub fn new(field: &'static str, collection: &'static str, id: RecordId) -> Self {
        Self { field, collection, id }
    }
}

/// Equality filters for list queries.
pub trait ListFilter: DeserializeOwned + Default + Send + Sync + 'static {
    fn conditions(&self) -> Vec<FieldFilter>;
}

/// `field = value` on the record's JSON representation.
///
/// Values compare as text, matching how Postgres renders `jsonb ->> field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: &'static str,
    pub value: String,
}

impl FieldFilter {
    pub fn new(field: &'static str, value: impl ToString) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match doc.get(self.field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => *s == self.value,
            Some(other) => other.to_string() == self.value,
        }
    }
}

/// Filter for collections that only support the unfiltered listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoFilter {}

impl ListFilter for NoFilter {
    fn conditions(&self) -> Vec<FieldFilter> {
        Vec::new()
    }
}
