use axum::Router;

use crate::app::services::AppServices;

pub mod bootstrap;
pub mod invoices;
pub mod organizations;
pub mod records;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints (mounted under `/api`).
pub fn router(services: &AppServices) -> Router {
    let stores = &services.records;

    Router::new()
        .nest("/users", users::router())
        .nest("/organizations", organizations::router())
        .nest("/accounts", records::router(stores.accounts.clone()))
        .nest("/contacts", records::router(stores.contacts.clone()))
        .nest("/leads", records::router(stores.leads.clone()))
        .nest("/opportunities", records::router(stores.opportunities.clone()))
        .nest("/activities", records::router(stores.activities.clone()))
        .nest("/invoices", invoices::router(services))
        .nest("/expenses", records::router(stores.expenses.clone()))
}
