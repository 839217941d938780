//! Middleware for the REST API server.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Create CORS middleware.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Request logging middleware.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "Request completed"
    );

    response
}

/// Bearer token check, active when the state carries an API key.
pub async fn auth_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(expected) = state.api_key() {
        if request.uri().path() != "/health" {
            let token = request
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "));

            if token != Some(expected.expose_secret().as_str()) {
                return ApiError::unauthorized("missing or invalid bearer token").into_response();
            }
        }
    }

    next.run(request).await
}
