use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crm_core::patch::{self, Nullable};
use crm_core::{DomainResult, FieldFilter, ListFilter, RecordId, RecordMeta, Reference, Resource, ResourceKind};

pub const DEFAULT_OPPORTUNITY_STAGE: &str = "qualify";

/// A potential deal against an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub account_id: Option<RecordId>,
    pub contact_id: Option<RecordId>,
    pub name: String,
    pub amount: Option<f64>,
    pub stage: String,
    /// Win probability in percent.
    pub probability: Option<i32>,
    pub close_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewOpportunity {
    pub account_id: Option<RecordId>,
    pub contact_id: Option<RecordId>,
    pub name: Option<String>,
    pub amount: Option<f64>,
    pub stage: Option<String>,
    pub probability: Option<i32>,
    pub close_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpportunityPatch {
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub account_id: Nullable<RecordId>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub contact_id: Nullable<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub amount: Nullable<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub probability: Nullable<i32>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub close_date: Nullable<NaiveDate>,
    #[serde(default, deserialize_with = "patch::present", skip_serializing_if = "Option::is_none")]
    pub description: Nullable<String>,
}

/// `?account_id=<id>`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpportunityFilter {
    pub account_id: Option<RecordId>,
}

impl ListFilter for OpportunityFilter {
    fn conditions(&self) -> Vec<FieldFilter> {
        self.account_id
            .iter()
            .map(|id| FieldFilter::new("account_id", id))
            .collect()
    }
}

impl Resource for Opportunity {
    const KIND: ResourceKind = ResourceKind {
        collection: "opportunities",
        label: "opportunity",
        delete_requires_admin: true,
    };

    type Draft = NewOpportunity;
    type Patch = OpportunityPatch;
    type Filter = OpportunityFilter;

    fn from_draft(meta: RecordMeta, draft: NewOpportunity) -> DomainResult<Self> {
        Ok(Self {
            meta,
            account_id: draft.account_id,
            contact_id: draft.contact_id,
            name: patch::required_text("name", draft.name)?,
            amount: draft.amount,
            stage: draft
                .stage
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_OPPORTUNITY_STAGE.to_string()),
            probability: draft.probability,
            close_date: draft.close_date,
            description: draft.description,
        })
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn validate(&self) -> DomainResult<()> {
        patch::non_blank("name", &self.name)
    }

    fn references(&self) -> Vec<Reference> {
        let accounts = self.account_id.map(|id| Reference::new("account_id", "accounts", id));
        let contacts = self.contact_id.map(|id| Reference::new("contact_id", "contacts", id));
        accounts.into_iter().chain(contacts).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::{OrganizationId, SubjectId};
    use serde_json::json;

    fn opportunity(body: serde_json::Value) -> Opportunity {
        let draft: NewOpportunity = serde_json::from_value(body).unwrap();
        Opportunity::from_draft(
            RecordMeta::new(OrganizationId::new(), SubjectId::parse("u1").unwrap()),
            draft,
        )
        .unwrap()
    }

    #[test]
    fn stage_defaults_to_qualify() {
        let opp = opportunity(json!({ "name": "Renewal" }));
        assert_eq!(opp.stage, "qualify");
        assert_eq!(opp.amount, None);
    }

    #[test]
    fn close_date_round_trips_as_iso_date() {
        let opp = opportunity(json!({ "name": "Renewal", "close_date": "2026-03-31", "amount": 1200.5 }));
        let doc = serde_json::to_value(&opp).unwrap();
        assert_eq!(doc["close_date"], "2026-03-31");
        assert_eq!(doc["amount"], 1200.5);
    }

    #[test]
    fn patch_moves_stage_and_clears_amount() {
        let opp = opportunity(json!({ "name": "Renewal", "amount": 10.0 }));
        let patch: OpportunityPatch =
            serde_json::from_value(json!({ "stage": "propose", "amount": null })).unwrap();
        let updated = opp.patched(&patch).unwrap();
        assert_eq!(updated.stage, "propose");
        assert_eq!(updated.amount, None);
        assert_eq!(updated.name, "Renewal");
    }

    #[test]
    fn blank_name_patch_is_rejected() {
        let opp = opportunity(json!({ "name": "Renewal" }));
        let patch: OpportunityPatch = serde_json::from_value(json!({ "name": "" })).unwrap();
        assert!(opp.patched(&patch).is_err());
    }

    #[test]
    fn account_and_contact_are_references() {
        let account = RecordId::new();
        let contact = RecordId::new();
        let opp = opportunity(json!({ "name": "Renewal", "account_id": account, "contact_id": contact }));
        assert_eq!(
            opp.references(),
            vec![
                Reference::new("account_id", "accounts", account),
                Reference::new("contact_id", "contacts", contact),
            ]
        );
    }
}
