use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crm_core::patch::{self, Nullable};
use crm_core::{DomainResult, FieldFilter, ListFilter, RecordId, RecordMeta, Reference, Resource, ResourceKind};

pub const DEFAULT_INVOICE_STATUS: &str = "draft";

/// A bill issued to an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub account_id: Option<RecordId>,
    /// Human-facing invoice number; uniqueness is not enforced.
    pub number: String,
    pub status: String,
    pub amount: Option<f64>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewInvoice {
    pub account_id: Option<RecordId>,
    pub number: Option<String>,
    pub status: Option<String>,
    pub amount: Option<f64>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoicePatch {
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub account_id: Nullable<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub amount: Nullable<f64>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub due_date: Nullable<NaiveDate>,
}

/// `?account_id=<id>`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceFilter {
    pub account_id: Option<RecordId>,
}

impl ListFilter for InvoiceFilter {
    fn conditions(&self) -> Vec<FieldFilter> {
        self.account_id
            .iter()
            .map(|id| FieldFilter::new("account_id", id))
            .collect()
    }
}

impl Resource for Invoice {
    const KIND: ResourceKind = ResourceKind {
        collection: "invoices",
        label: "invoice",
        delete_requires_admin: false,
    };

    type Draft = NewInvoice;
    type Patch = InvoicePatch;
    type Filter = InvoiceFilter;

    fn from_draft(meta: RecordMeta, draft: NewInvoice) -> DomainResult<Self> {
        Ok(Self {
            meta,
            account_id: draft.account_id,
            number: patch::required_text("number", draft.number)?,
            status: draft
                .status
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_INVOICE_STATUS.to_string()),
            amount: draft.amount,
            due_date: draft.due_date,
        })
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn validate(&self) -> DomainResult<()> {
        patch::non_blank("number", &self.number)
    }

    fn references(&self) -> Vec<Reference> {
        self.account_id
            .map(|id| Reference::new("account_id", "accounts", id))
            .into_iter()
            .collect()
    }
}
