//! Sales domain module: leads, opportunities and the activities logged
//! against them.
//!
//! Pure record definitions and validation rules: no IO, no HTTP, no storage.

pub mod activity;
pub mod lead;
pub mod opportunity;

pub use activity::{Activity, ActivityFilter, ActivityPatch, NewActivity};
pub use lead::{Lead, LeadPatch, NewLead};
pub use opportunity::{NewOpportunity, Opportunity, OpportunityFilter, OpportunityPatch};
