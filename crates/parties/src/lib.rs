//! Parties domain module (accounts and the contacts attached to them).
//!
//! Pure record definitions and validation rules: no IO, no HTTP, no storage.

pub mod account;
pub mod contact;

pub use account::{Account, AccountPatch, NewAccount};
pub use contact::{Contact, ContactFilter, ContactPatch, NewContact};
