use serde::{Deserialize, Serialize};

use crm_core::patch::{self, Nullable};
use crm_core::{DomainResult, FieldFilter, ListFilter, RecordId, RecordMeta, Reference, Resource, ResourceKind};

/// A person, optionally attached to an [`Account`](crate::Account).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub account_id: Option<RecordId>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewContact {
    pub account_id: Option<RecordId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactPatch {
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub account_id: Nullable<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub email: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub phone: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub mobile: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub title: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub department: Nullable<String>,
}

/// `?account_id=<id>`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactFilter {
    pub account_id: Option<RecordId>,
}

impl ListFilter for ContactFilter {
    fn conditions(&self) -> Vec<FieldFilter> {
        self.account_id
            .iter()
            .map(|id| FieldFilter::new("account_id", id))
            .collect()
    }
}

impl Resource for Contact {
    const KIND: ResourceKind = ResourceKind {
        collection: "contacts",
        label: "contact",
        delete_requires_admin: true,
    };

    type Draft = NewContact;
    type Patch = ContactPatch;
    type Filter = ContactFilter;

    fn from_draft(meta: RecordMeta, draft: NewContact) -> DomainResult<Self> {
        Ok(Self {
            meta,
            account_id: draft.account_id,
            first_name: patch::required_text("first_name", draft.first_name)?,
            last_name: patch::required_text("last_name", draft.last_name)?,
            email: draft.email,
            phone: draft.phone,
            mobile: draft.mobile,
            title: draft.title,
            department: draft.department,
        })
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn validate(&self) -> DomainResult<()> {
        patch::non_blank("first_name", &self.first_name)?;
        patch::non_blank("last_name", &self.last_name)
    }

    fn references(&self) -> Vec<Reference> {
        self.account_id
            .map(|id| Reference::new("account_id", "accounts", id))
            .into_iter()
            .collect()
    }
}
