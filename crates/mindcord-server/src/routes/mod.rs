//! Route definitions for the REST API.

mod events;
mod health;
mod profiles;
mod reminders;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health and introspection
        .route("/health", get(health::health_check))
        .route("/mood", get(health::get_mood))
        .route("/status", get(health::get_status))
        // Chat events
        .route("/events", post(events::post_event))
        // Profiles
        .route("/users/:id", get(profiles::get_user))
        .route(
            "/users/:id/memories",
            post(profiles::add_memory).delete(profiles::forget_memories),
        )
        .route("/venues/:id", get(profiles::get_venue))
        // Reminders
        .route("/reminders", post(reminders::create_reminder))
        .with_state(state)
}

pub use events::*;
pub use health::*;
pub use profiles::*;
pub use reminders::*;
