//! CRUD endpoints shared by every tenant-scoped business entity.
//!
//! Every operation is scoped by the caller's organization; a record of
//! another tenant (or an id that does not parse) is reported as not found.
//! Ids a record points at must name records of the same organization.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::get,
};
use serde_json::Value;
use tracing::info;

use crm_auth::GuardError;
use crm_core::{ListFilter, OrganizationId, RecordId, RecordMeta, Reference, Resource};
use crm_infra::RecordStore;

use crate::app::dto::{self, ApiJson, ApiQuery};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::TenantMember;

type Store<R> = Arc<dyn RecordStore<R>>;

pub fn router<R: Resource>(store: Store<R>) -> Router {
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/:id", get(fetch::<R>).put(update::<R>).delete(remove::<R>))
        .layer(Extension(store))
}

pub async fn list<R: Resource>(
    TenantMember(scope): TenantMember,
    Extension(store): Extension<Store<R>>,
    ApiQuery(filter): ApiQuery<R::Filter>,
) -> Result<Json<Vec<R>>, ApiError> {
    let records = store
        .list(scope.organization_id, &filter.conditions())
        .await?;
    Ok(Json(records))
}

pub async fn fetch<R: Resource>(
    TenantMember(scope): TenantMember,
    Extension(store): Extension<Store<R>>,
    Path(id): Path<String>,
) -> Result<Json<R>, ApiError> {
    let id = record_id::<R>(&id)?;
    store
        .get(scope.organization_id, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(R::KIND.label))
}

pub async fn create<R: Resource>(
    TenantMember(scope): TenantMember,
    Extension(services): Extension<Arc<AppServices>>,
    Extension(store): Extension<Store<R>>,
    ApiJson(draft): ApiJson<R::Draft>,
) -> Result<(StatusCode, Json<R>), ApiError> {
    let meta = RecordMeta::new(scope.organization_id, scope.subject);
    let record = R::from_draft(meta, draft)?;
    ensure_references(&services, scope.organization_id, record.references()).await?;
    let record = store.insert(record).await?;

    info!(
        kind = R::KIND.label,
        id = %record.id(),
        organization_id = %record.organization_id(),
        "record created"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update<R: Resource>(
    TenantMember(scope): TenantMember,
    Extension(services): Extension<Arc<AppServices>>,
    Extension(store): Extension<Store<R>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<R::Patch>,
) -> Result<Json<R>, ApiError> {
    let id = record_id::<R>(&id)?;
    let current = store
        .get(scope.organization_id, id)
        .await?
        .ok_or(ApiError::NotFound(R::KIND.label))?;

    // Only links the patch introduces are checked.
    let kept = current.references();
    let introduced = current
        .patched(&patch)?
        .references()
        .into_iter()
        .filter(|reference| !kept.contains(reference));
    ensure_references(&services, scope.organization_id, introduced).await?;

    store
        .update(scope.organization_id, id, &patch)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(R::KIND.label))
}

pub async fn remove<R: Resource>(
    TenantMember(scope): TenantMember,
    Extension(store): Extension<Store<R>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if R::KIND.delete_requires_admin && !scope.role.is_admin() {
        return Err(GuardError::AdminRequired.into());
    }

    let id = record_id::<R>(&id)?;
    if !store.delete(scope.organization_id, id).await? {
        return Err(ApiError::NotFound(R::KIND.label));
    }

    info!(kind = R::KIND.label, id = %id, organization_id = %scope.organization_id, "record deleted");
    Ok(dto::success())
}

/// A reference to a missing record and one to another tenant's record are
/// rejected with the same message.
async fn ensure_references(
    services: &AppServices,
    organization_id: OrganizationId,
    references: impl IntoIterator<Item = Reference>,
) -> Result<(), ApiError> {
    for reference in references {
        if !services.records.resolves(organization_id, &reference).await? {
            return Err(ApiError::bad_request(format!(
                "{} does not match a record in this organization",
                reference.field
            )));
        }
    }
    Ok(())
}

fn record_id<R: Resource>(raw: &str) -> Result<RecordId, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound(R::KIND.label))
}
