//! Accounting domain module (tenant expenses).
//!
//! Pure record definitions and validation rules: no IO, no HTTP, no storage.

pub mod expense;

pub use expense::{Expense, ExpenseFilter, ExpensePatch, NewExpense};
