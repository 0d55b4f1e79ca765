//! `crm-client` — typed HTTP client for the CRM API.
//!
//! There is no ambient token: every authenticated call takes the caller's
//! [`Session`] explicitly.

pub mod client;
pub mod error;

pub use client::{CrmClient, Session, Signup, SignupForm};
pub use error::ClientError;
