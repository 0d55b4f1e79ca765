//! Invoicing domain module.
//!
//! Pure record definitions and validation rules: no IO, no HTTP, no storage.

pub mod invoice;

pub use invoice::{Invoice, InvoiceFilter, InvoicePatch, NewInvoice};
