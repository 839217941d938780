//! Scheduled reminders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reminder waiting in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    /// User who asked for the reminder; tagged on delivery.
    pub owner_user_id: String,
    /// Channel the reminder is delivered to.
    pub channel_id: String,
    pub text: String,
    pub fire_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    /// Create a reminder firing at `fire_at`.
    pub fn new(
        owner_user_id: impl Into<String>,
        channel_id: impl Into<String>,
        text: impl Into<String>,
        fire_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_user_id: owner_user_id.into(),
            channel_id: channel_id.into(),
            text: text.into(),
            fire_at,
            created_at: Utc::now(),
        }
    }

    /// Whether the reminder is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.fire_at <= now
    }
}
