use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crm_auth::{Identity, Principal};
use crm_infra::{IdentityProvider, TenantDirectory};

use crate::app::errors::ApiError;

/// Auth Resolver: bearer token → verified identity → Principal.
///
/// Read-only. An identity without a directory row gets a provisional
/// principal with no organization; any failure to verify or resolve is
/// `Unauthenticated`.
#[derive(Clone)]
pub struct AuthState {
    pub identities: Arc<dyn IdentityProvider>,
    pub directory: Arc<dyn TenantDirectory>,
}

impl AuthState {
    pub async fn resolve(&self, token: &str) -> Result<(Identity, Principal), ApiError> {
        let identity = self.identities.verify_token(token).map_err(|e| {
            debug!(error = %e, "bearer token rejected");
            ApiError::unauthenticated("invalid or expired token")
        })?;

        match self.directory.find_user(&identity.subject).await {
            Ok(Some(row)) => Ok((identity, Principal::from(row))),
            Ok(None) => {
                let principal = Principal::provisional(&identity);
                Ok((identity, principal))
            }
            Err(e) => {
                warn!(error = %e, subject = %identity.subject, "directory lookup failed");
                Err(ApiError::unauthenticated("unable to resolve principal"))
            }
        }
    }
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;
    let (identity, principal) = state.resolve(token).await?;

    req.extensions_mut().insert(identity);
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let missing = || ApiError::unauthenticated("missing bearer token");

    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(missing)?;

    let header = header.to_str().map_err(|_| missing())?;

    let header = header.strip_prefix("Bearer ").ok_or_else(missing)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(missing());
    }

    Ok(token)
}
