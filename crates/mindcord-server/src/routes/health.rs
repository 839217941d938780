//! Health, mood and status endpoints.

use axum::{extract::State, Json};
use mindcord_core::{MoodReport, StatusReport};
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub agent_name: String,
    pub version: String,
}

/// Health check endpoint.
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        agent_name: state.engine.config().agent_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Current mood.
/// GET /mood
pub async fn get_mood(State(state): State<AppState>) -> ApiResult<Json<MoodReport>> {
    Ok(Json(state.engine.mood_report().await?))
}

/// Engine status and loop health.
/// GET /status
pub async fn get_status(State(state): State<AppState>) -> ApiResult<Json<StatusReport>> {
    Ok(Json(state.engine.status().await?))
}
