use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crm_core::patch::{self, Nullable};
use crm_core::{DomainResult, FieldFilter, ListFilter, RecordId, RecordMeta, Reference, Resource, ResourceKind};

/// A call, meeting, task or note, optionally about another record.
///
/// `regarding_type` names the collection (`"account"`, `"contact"`, ...) and
/// `regarding_id` the record within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(rename = "type")]
    pub kind: String,
    pub subject: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub regarding_type: Option<String>,
    pub regarding_id: Option<RecordId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewActivity {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
    pub regarding_type: Option<String>,
    pub regarding_id: Option<RecordId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub description: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub due_date: Nullable<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub regarding_type: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub regarding_id: Nullable<RecordId>,
}

/// `?regarding_type=<kind>&regarding_id=<id>`; applied only when both are given.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    pub regarding_type: Option<String>,
    pub regarding_id: Option<RecordId>,
}

impl ListFilter for ActivityFilter {
    fn conditions(&self) -> Vec<FieldFilter> {
        match (&self.regarding_type, &self.regarding_id) {
            (Some(kind), Some(id)) => vec![
                FieldFilter::new("regarding_type", kind),
                FieldFilter::new("regarding_id", id),
            ],
            _ => Vec::new(),
        }
    }
}

impl Resource for Activity {
    const KIND: ResourceKind = ResourceKind {
        collection: "activities",
        label: "activity",
        delete_requires_admin: false,
    };

    type Draft = NewActivity;
    type Patch = ActivityPatch;
    type Filter = ActivityFilter;

    fn from_draft(meta: RecordMeta, draft: NewActivity) -> DomainResult<Self> {
        Ok(Self {
            meta,
            kind: patch::required_text("type", draft.kind)?,
            subject: patch::required_text("subject", draft.subject)?,
            description: draft.description,
            due_date: draft.due_date,
            completed: draft.completed.unwrap_or(false),
            regarding_type: draft.regarding_type,
            regarding_id: draft.regarding_id,
        })
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn validate(&self) -> DomainResult<()> {
        patch::non_blank("type", &self.kind)?;
        patch::non_blank("subject", &self.subject)
    }

    /// `regarding_id` is checked when `regarding_type` names a known
    /// collection; other types are free-form links.
    fn references(&self) -> Vec<Reference> {
        let (Some(kind), Some(id)) = (self.regarding_type.as_deref(), self.regarding_id) else {
            return Vec::new();
        };
        regarded_collection(kind)
            .map(|collection| Reference::new("regarding_id", collection, id))
            .into_iter()
            .collect()
    }
}

/// Collection behind a `regarding_type` value (`"account"` or `"accounts"`).
fn regarded_collection(kind: &str) -> Option<&'static str> {
    match kind.trim().to_ascii_lowercase().as_str() {
        "account" | "accounts" => Some("accounts"),
        "contact" | "contacts" => Some("contacts"),
        "lead" | "leads" => Some("leads"),
        "opportunity" | "opportunities" => Some("opportunities"),
        "invoice" | "invoices" => Some("invoices"),
        "expense" | "expenses" => Some("expenses"),
        _ => None,
    }
}
