use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crm_auth::GuardError;
use crm_core::DomainError;
use crm_infra::{BootstrapError, StoreError};

/// Every failure a handler can return; rendered as
/// `{"error": <code>, "message": <text>}`.
#[derive(Debug)]
pub enum ApiError {
    /// Missing, invalid or unresolvable bearer token.
    Unauthenticated(String),
    Forbidden(GuardError),
    BadRequest(String),
    AlreadyProvisioned(String),
    /// Also covers records of other tenants and malformed ids.
    NotFound(&'static str),
    /// Detail is logged, never sent to the client.
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthenticated(msg) => json_error(StatusCode::UNAUTHORIZED, "unauthenticated", msg),
            ApiError::Forbidden(e) => json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()),
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::AlreadyProvisioned(msg) => {
                json_error(StatusCode::BAD_REQUEST, "already_provisioned", msg)
            }
            ApiError::NotFound(label) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{label} not found")),
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "request failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
            }
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl From<GuardError> for ApiError {
    fn from(e: GuardError) -> Self {
        ApiError::Forbidden(e)
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ApiError::BadRequest(msg),
            DomainError::AlreadyProvisioned(msg) => ApiError::AlreadyProvisioned(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) | StoreError::InvalidRecord(msg) => {
                tracing::debug!(error = %msg, "store rejected write");
                ApiError::BadRequest("the request conflicts with stored data".to_string())
            }
            StoreError::Backend(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<BootstrapError> for ApiError {
    fn from(e: BootstrapError) -> Self {
        match e {
            BootstrapError::UnknownIdentity(subject) => {
                ApiError::BadRequest(format!("user {subject} is not a registered identity"))
            }
            BootstrapError::Domain(e) => e.into(),
            BootstrapError::Store(e) => e.into(),
            BootstrapError::Identity(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
