//! mindcord-server - HTTP bridge for the mindcord engine.
//!
//! A chat platform adapter posts inbound messages to `/events`; the engine's
//! replies, outreach openers and reminders come back as signed webhook POSTs.
//!
//! # Example
//!
//! ```ignore
//! use mindcord_server::{create_server, AppState};
//!
//! let state = AppState::new(engine);
//! let app = create_server(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod webhook;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
pub use webhook::{ChannelDirectory, WebhookConfig, WebhookSink};

use axum::{middleware as axum_middleware, Router};
use tower_http::trace::TraceLayer;

/// Create the server with all routes and middleware.
///
/// Bearer authentication is enforced when the state carries an API key.
pub fn create_server(state: AppState) -> Router {
    routes::create_router(state.clone())
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors_layer())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
}
