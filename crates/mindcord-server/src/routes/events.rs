//! Inbound chat events.

use axum::{extract::State, http::StatusCode, Json};
use mindcord_core::{DecisionBasis, EventOutcome, InboundEvent, ReplyOutcome};
use serde::Serialize;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// What the engine did with a posted event.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventResponse {
    /// Handed to the dispatcher; handled asynchronously.
    Queued,
    Ignored,
    Command {
        command: String,
        delivered: bool,
    },
    Skipped {
        #[serde(skip_serializing_if = "Option::is_none")]
        probability: Option<f64>,
    },
    Replied {
        reply: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        chunks: Option<usize>,
    },
}

impl From<EventOutcome> for EventResponse {
    fn from(outcome: EventOutcome) -> Self {
        match outcome {
            EventOutcome::Ignored => EventResponse::Ignored,
            EventOutcome::Command { kind, delivered } => EventResponse::Command {
                command: kind.to_string(),
                delivered,
            },
            EventOutcome::Skipped(decision) => EventResponse::Skipped {
                probability: match decision.basis {
                    DecisionBasis::Heuristic { probability, .. } => Some(probability),
                    _ => None,
                },
            },
            EventOutcome::Replied { reply, .. } => match reply {
                ReplyOutcome::Delivered { chunks, .. } => EventResponse::Replied {
                    reply: "delivered",
                    chunks: Some(chunks),
                },
                ReplyOutcome::Fallback { .. } => EventResponse::Replied {
                    reply: "fallback",
                    chunks: None,
                },
                ReplyOutcome::Undelivered => EventResponse::Replied {
                    reply: "undelivered",
                    chunks: None,
                },
            },
        }
    }
}

/// Accept one inbound chat event.
/// POST /events
///
/// With a dispatcher attached the event is queued (202); otherwise it is
/// handled before the response is sent (200).
pub async fn post_event(
    State(state): State<AppState>,
    Json(event): Json<InboundEvent>,
) -> ApiResult<(StatusCode, Json<EventResponse>)> {
    if event.author_id.trim().is_empty() || event.channel_id.trim().is_empty() {
        return Err(ApiError::bad_request("author_id and channel_id are required"));
    }

    if let (Some(venue_id), Some(name)) = (&event.venue_id, &event.channel_name) {
        state.channels().observe(venue_id, &event.channel_id, name).await;
    }

    match state.events() {
        Some(queue) => {
            queue.send(event).await.map_err(|_| {
                warn!("Event dispatcher stopped, rejecting event");
                ApiError::unavailable("event dispatcher is not running")
            })?;
            Ok((StatusCode::ACCEPTED, Json(EventResponse::Queued)))
        }
        None => {
            let outcome = state.engine.handle_event(&event).await;
            Ok((StatusCode::OK, Json(outcome.into())))
        }
    }
}
