//! Reminder scheduling.

use axum::{extract::State, http::StatusCode, Json};
use mindcord_core::Reminder;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReminderRequest {
    pub user_id: String,
    pub channel_id: String,
    pub minutes: i64,
    pub text: String,
}

/// Schedule a reminder.
/// POST /reminders
pub async fn create_reminder(
    State(state): State<AppState>,
    Json(request): Json<ReminderRequest>,
) -> ApiResult<(StatusCode, Json<Reminder>)> {
    let reminder = state
        .engine
        .schedule_reminder(
            &request.user_id,
            &request.channel_id,
            request.minutes,
            &request.text,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(reminder)))
}
