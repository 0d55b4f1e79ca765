//! Directory endpoints: the caller's own row and the members of their
//! organization.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::{get, put},
};
use serde_json::Value;

use crm_auth::{DirectoryUser, DirectoryUserPatch, Identity};
use crm_core::SubjectId;
use crm_infra::Profile;

use crate::app::dto::{self, ApiJson, CreateProfileBody};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::{TenantAdmin, TenantMember};

pub fn router() -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/", get(list_members).post(create_profile))
        .route("/:id", put(update_member).delete(remove_member))
}

/// The caller's directory row, provisioning a private organization on first
/// access.
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<DirectoryUser>, ApiError> {
    Ok(Json(services.bootstrapper.ensure_user(&identity).await?))
}

pub async fn create_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<CreateProfileBody>,
) -> Result<(StatusCode, Json<DirectoryUser>), ApiError> {
    let email = body.email.unwrap_or_default();
    let profile = services
        .bootstrapper
        .create_profile(&identity.subject, &email, body.full_name)
        .await?;

    Ok(match profile {
        Profile::Created(user) => (StatusCode::CREATED, Json(user)),
        Profile::Existing(user) => (StatusCode::OK, Json(user)),
    })
}

pub async fn list_members(
    TenantMember(scope): TenantMember,
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<DirectoryUser>>, ApiError> {
    Ok(Json(services.directory.list_users(scope.organization_id).await?))
}

pub async fn update_member(
    TenantAdmin(scope): TenantAdmin,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<DirectoryUserPatch>,
) -> Result<Json<DirectoryUser>, ApiError> {
    let id = member_id(id)?;
    services
        .directory
        .update_user(scope.organization_id, &id, &patch)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("user"))
}

pub async fn remove_member(
    TenantAdmin(scope): TenantAdmin,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = member_id(id)?;
    if id == scope.subject {
        return Err(ApiError::bad_request("Cannot delete yourself"));
    }

    if !services.directory.delete_user(scope.organization_id, &id).await? {
        return Err(ApiError::NotFound("user"));
    }
    Ok(dto::success())
}

fn member_id(raw: String) -> Result<SubjectId, ApiError> {
    SubjectId::parse(raw).map_err(|_| ApiError::NotFound("user"))
}
