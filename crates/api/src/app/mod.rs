//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: adapter wiring (directory, identity provider, record stores)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON extractors
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crm_infra::CorsOrigins;

use crate::middleware::{self, AuthState};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<AppServices>, cors: &CorsOrigins) -> Router {
    let auth_state = AuthState {
        identities: services.identities.clone(),
        directory: services.directory.clone(),
    };

    // Signup runs before the caller has a directory row or a session.
    let public = Router::new()
        .nest("/bootstrap", routes::bootstrap::router())
        .layer(Extension(services.clone()));

    // Protected routes: require a verified bearer token.
    let protected = routes::router(&services)
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", public.merge(protected))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors)),
        )
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(list) => {
            let origins: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(origins)
        }
    }
}
