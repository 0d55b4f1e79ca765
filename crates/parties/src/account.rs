use serde::{Deserialize, Serialize};

use crm_core::patch::{self, Nullable};
use crm_core::{DomainResult, NoFilter, RecordMeta, Resource, ResourceKind};

/// A company or organization the tenant does business with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub name: String,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewAccount {
    pub name: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub industry: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub website: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub phone: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub address: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub city: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub state: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub postal_code: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub country: Nullable<String>,
}

impl Resource for Account {
    const KIND: ResourceKind = ResourceKind {
        collection: "accounts",
        label: "account",
        delete_requires_admin: true,
    };

    type Draft = NewAccount;
    type Patch = AccountPatch;
    type Filter = NoFilter;

    fn from_draft(meta: RecordMeta, draft: NewAccount) -> DomainResult<Self> {
        Ok(Self {
            meta,
            name: patch::required_text("name", draft.name)?,
            industry: draft.industry,
            website: draft.website,
            phone: draft.phone,
            address: draft.address,
            city: draft.city,
            state: draft.state,
            postal_code: draft.postal_code,
            country: draft.country,
        })
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn validate(&self) -> DomainResult<()> {
        patch::non_blank("name", &self.name)
    }
}
