//! The caller's organization.

use std::sync::Arc;

use axum::{Extension, Json, Router, http::StatusCode, routing::get};

use crm_auth::{Organization, Principal};
use crm_core::patch::required_text;

use crate::app::dto::{ApiJson, OrganizationBody};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::{TenantAdmin, TenantMember};

pub fn router() -> Router {
    Router::new().route(
        "/",
        get(current_organization)
            .post(create_organization)
            .put(rename_organization),
    )
}

pub async fn current_organization(
    TenantMember(scope): TenantMember,
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Organization>, ApiError> {
    services
        .directory
        .find_organization(scope.organization_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("organization"))
}

/// Create an organization and make the caller its admin.
pub async fn create_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<OrganizationBody>,
) -> Result<(StatusCode, Json<Organization>), ApiError> {
    let name = required_text("name", body.name)?;
    let organization = services
        .bootstrapper
        .create_organization(&principal, &name)
        .await?;
    Ok((StatusCode::CREATED, Json(organization)))
}

pub async fn rename_organization(
    TenantAdmin(scope): TenantAdmin,
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<OrganizationBody>,
) -> Result<Json<Organization>, ApiError> {
    let name = required_text("name", body.name)?;
    services
        .directory
        .rename_organization(scope.organization_id, &name)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("organization"))
}
