//! User and venue profile endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use mindcord_core::types::MemoryNote;
use mindcord_core::{MindcordError, UserProfile, VenueProfile};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

/// Get a user profile.
/// GET /users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    let profile = state
        .engine
        .user_profile(&user_id)
        .await?
        .ok_or_else(|| MindcordError::user_not_found(&user_id))?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
pub struct RememberRequest {
    pub text: String,
}

/// Store a memory about a user.
/// POST /users/:id/memories
pub async fn add_memory(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<RememberRequest>,
) -> ApiResult<(StatusCode, Json<MemoryNote>)> {
    let note = state.engine.remember(&user_id, &request.text).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[derive(Debug, Deserialize)]
pub struct ForgetQuery {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ForgetResponse {
    pub removed: usize,
}

/// Remove memories containing a text.
/// DELETE /users/:id/memories?text=...
pub async fn forget_memories(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ForgetQuery>,
) -> ApiResult<Json<ForgetResponse>> {
    let removed = state.engine.forget(&user_id, &query.text).await?;
    Ok(Json(ForgetResponse { removed }))
}

/// Get a venue profile.
/// GET /venues/:id
pub async fn get_venue(
    State(state): State<AppState>,
    Path(venue_id): Path<String>,
) -> ApiResult<Json<VenueProfile>> {
    let venue = state
        .engine
        .venue_profile(&venue_id)
        .await?
        .ok_or_else(|| MindcordError::venue_not_found(&venue_id))?;
    Ok(Json(venue))
}
