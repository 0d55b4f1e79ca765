//! `crm-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod claims;
pub mod directory;
pub mod guard;
pub mod principal;
pub mod provisioning;
pub mod roles;

pub use claims::{AccessTokenClaims, Hs256TokenVerifier, Identity, TokenValidationError, TokenVerifier};
pub use directory::{DirectoryUser, DirectoryUserPatch, Organization};
pub use guard::{GuardError, TenantScope, require_admin, require_membership, require_tenant_admin};
pub use principal::Principal;
pub use provisioning::ProvisioningPlan;
pub use roles::{Role, UnknownRole};
