//! Invoice endpoints: the shared record CRUD, with reads carrying the name
//! of the billed account.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{Extension, Json, Router, extract::Path, routing::get};
use serde::Serialize;

use crm_core::{ListFilter, RecordId, Resource};
use crm_invoicing::{Invoice, InvoiceFilter};

use crate::app::dto::ApiQuery;
use crate::app::errors::ApiError;
use crate::app::routes::records;
use crate::app::services::AppServices;
use crate::context::TenantMember;

/// Shown when an invoice has no account, or its account is gone.
pub const UNKNOWN_ACCOUNT: &str = "Unknown";

/// An invoice as returned by `GET /api/invoices[/:id]`.
#[derive(Debug, Serialize)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub account_name: String,
}

pub fn router(services: &AppServices) -> Router {
    let store = services.records.invoices.clone();
    Router::new()
        .route("/", get(list).post(records::create::<Invoice>))
        .route(
            "/:id",
            get(fetch)
                .put(records::update::<Invoice>)
                .delete(records::remove::<Invoice>),
        )
        .layer(Extension(store))
}

fn account_name(names: &HashMap<RecordId, String>, invoice: &Invoice) -> String {
    invoice
        .account_id
        .and_then(|id| names.get(&id).cloned())
        .unwrap_or_else(|| UNKNOWN_ACCOUNT.to_string())
}

async fn list(
    TenantMember(scope): TenantMember,
    Extension(services): Extension<Arc<AppServices>>,
    ApiQuery(filter): ApiQuery<InvoiceFilter>,
) -> Result<Json<Vec<InvoiceView>>, ApiError> {
    let stores = &services.records;
    let invoices = stores
        .invoices
        .list(scope.organization_id, &filter.conditions())
        .await?;
    let names: HashMap<RecordId, String> = stores
        .accounts
        .list(scope.organization_id, &[])
        .await?
        .into_iter()
        .map(|account| (account.id(), account.name))
        .collect();

    let views = invoices
        .into_iter()
        .map(|invoice| InvoiceView {
            account_name: account_name(&names, &invoice),
            invoice,
        })
        .collect();
    Ok(Json(views))
}

async fn fetch(
    TenantMember(scope): TenantMember,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<InvoiceView>, ApiError> {
    let stores = &services.records;
    let id: RecordId = id
        .parse()
        .map_err(|_| ApiError::NotFound(Invoice::KIND.label))?;
    let invoice = stores
        .invoices
        .get(scope.organization_id, id)
        .await?
        .ok_or(ApiError::NotFound(Invoice::KIND.label))?;

    let mut names = HashMap::new();
    if let Some(account_id) = invoice.account_id {
        if let Some(account) = stores.accounts.get(scope.organization_id, account_id).await? {
            names.insert(account_id, account.name);
        }
    }
    Ok(Json(InvoiceView {
        account_name: account_name(&names, &invoice),
        invoice,
    }))
}
