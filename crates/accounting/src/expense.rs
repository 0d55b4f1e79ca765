use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crm_core::patch::{self, Nullable};
use crm_core::{DomainResult, FieldFilter, ListFilter, RecordMeta, Resource, ResourceKind};

/// Money spent by the tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub description: String,
    pub amount: f64,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewExpense {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpensePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub category: Nullable<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub date: Nullable<NaiveDate>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub vendor: Nullable<String>,
}

/// `?category=<name>`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseFilter {
    pub category: Option<String>,
}

impl ListFilter for ExpenseFilter {
    fn conditions(&self) -> Vec<FieldFilter> {
        self.category
            .iter()
            .map(|c| FieldFilter::new("category", c))
            .collect()
    }
}

impl Resource for Expense {
    const KIND: ResourceKind = ResourceKind {
        collection: "expenses",
        label: "expense",
        delete_requires_admin: false,
    };

    type Draft = NewExpense;
    type Patch = ExpensePatch;
    type Filter = ExpenseFilter;

    fn from_draft(meta: RecordMeta, draft: NewExpense) -> DomainResult<Self> {
        Ok(Self {
            meta,
            description: patch::required_text("description", draft.description)?,
            amount: patch::required("amount", draft.amount)?,
            category: draft.category,
            date: draft.date,
            vendor: draft.vendor,
        })
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn validate(&self) -> DomainResult<()> {
        patch::non_blank("description", &self.description)
    }
}
