use serde::{Deserialize, Serialize};

use crm_core::patch::{self, Nullable};
use crm_core::{DomainResult, NoFilter, RecordMeta, Resource, ResourceKind};

pub const DEFAULT_LEAD_STATUS: &str = "new";

/// An unqualified prospect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub status: String,
    pub source: Option<String>,
    pub rating: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewLead {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub rating: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub email: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub phone: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub company: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub title: Nullable<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub source: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub rating: Nullable<String>,
}

impl Resource for Lead {
    const KIND: ResourceKind = ResourceKind {
        collection: "leads",
        label: "lead",
        delete_requires_admin: true,
    };

    type Draft = NewLead;
    type Patch = LeadPatch;
    type Filter = NoFilter;

    fn from_draft(meta: RecordMeta, draft: NewLead) -> DomainResult<Self> {
        Ok(Self {
            meta,
            first_name: patch::required_text("first_name", draft.first_name)?,
            last_name: patch::required_text("last_name", draft.last_name)?,
            email: draft.email,
            phone: draft.phone,
            company: draft.company,
            title: draft.title,
            status: draft
                .status
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LEAD_STATUS.to_string()),
            source: draft.source,
            rating: draft.rating,
        })
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn validate(&self) -> DomainResult<()> {
        patch::non_blank("first_name", &self.first_name)?;
        patch::non_blank("last_name", &self.last_name)
    }
}
