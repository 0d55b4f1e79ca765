//! Request DTOs and JSON extractors.

use axum::extract::{FromRequest, FromRequestParts};
use serde::{Deserialize, Serialize};

use crm_auth::{DirectoryUser, Organization};

use crate::app::errors::ApiError;

/// `axum::Json` whose rejections render as 400 `bad_request`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` whose rejections render as 400 `bad_request`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `POST /api/bootstrap/signup`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupBody {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub org_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user: DirectoryUser,
    pub organization: Organization,
}

/// `POST /api/users`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateProfileBody {
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// `POST|PUT /api/organizations`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrganizationBody {
    pub name: Option<String>,
}

pub fn success() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "success": true }))
}
