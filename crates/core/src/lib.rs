//! `crm-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod patch;
pub mod resource;

pub use error::{DomainError, DomainResult};
pub use id::{OrganizationId, RecordId, SubjectId};
pub use patch::Nullable;
pub use resource::{FieldFilter, ListFilter, NoFilter, RecordMeta, Reference, Resource, ResourceKind};
