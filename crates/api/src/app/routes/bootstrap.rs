//! Unauthenticated signup: create an organization owned by an existing
//! identity.

use std::sync::Arc;

use axum::{Extension, Json, Router, http::StatusCode, routing::post};

use crm_core::SubjectId;
use crm_infra::SignupRequest;

use crate::app::dto::{ApiJson, SignupBody, SignupResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/signup", post(signup))
}

pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<SignupBody>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let (Some(user_id), Some(email), Some(org_name)) = (body.user_id, body.email, body.org_name)
    else {
        return Err(ApiError::bad_request("userId, email and org_name are required"));
    };

    let request = SignupRequest {
        subject: SubjectId::parse(user_id)?,
        email,
        full_name: body.full_name,
        organization_name: org_name,
    };

    let plan = services.bootstrapper.signup(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user: plan.user,
            organization: plan.organization,
        }),
    ))
}
