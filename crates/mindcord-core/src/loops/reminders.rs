//! Reminder queue and the loop that fires due reminders.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::BackgroundTask;
use crate::error::{MindcordError, MindcordResult};
use crate::traits::DeliverySink;
use crate::types::Reminder;

/// In-memory queue of pending reminders.
pub struct ReminderQueue {
    pending: Mutex<Vec<Reminder>>,
    max_horizon_minutes: u32,
}

impl ReminderQueue {
    pub fn new(max_horizon_minutes: u32) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            max_horizon_minutes,
        }
    }

    pub fn max_horizon_minutes(&self) -> u32 {
        self.max_horizon_minutes
    }

    /// Queue a reminder `minutes` from `now`.
    pub async fn schedule(
        &self,
        owner_user_id: &str,
        channel_id: &str,
        text: &str,
        minutes: i64,
        now: DateTime<Utc>,
    ) -> MindcordResult<Reminder> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MindcordError::validation("reminder text must not be empty"));
        }
        if minutes < 1 || minutes > i64::from(self.max_horizon_minutes) {
            return Err(MindcordError::validation_with_suggestion(
                format!("reminder horizon {} minutes is out of range", minutes),
                format!("use between 1 and {} minutes", self.max_horizon_minutes),
            ));
        }

        let reminder = Reminder {
            created_at: now,
            ..Reminder::new(owner_user_id, channel_id, text, now + Duration::minutes(minutes))
        };
        self.pending.lock().await.push(reminder.clone());
        debug!(
            reminder_id = %reminder.id,
            user_id = %owner_user_id,
            fire_at = %reminder.fire_at,
            "Reminder scheduled"
        );
        Ok(reminder)
    }

    /// Number of reminders not yet fired.
    pub async fn pending(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Pending reminders of one user, soonest first.
    pub async fn pending_for(&self, owner_user_id: &str) -> Vec<Reminder> {
        let mut reminders: Vec<Reminder> = self
            .pending
            .lock()
            .await
            .iter()
            .filter(|r| r.owner_user_id == owner_user_id)
            .cloned()
            .collect();
        reminders.sort_by_key(|r| r.fire_at);
        reminders
    }

    /// Remove and return every reminder due at `now`.
    pub async fn take_due(&self, now: DateTime<Utc>) -> Vec<Reminder> {
        let mut pending = self.pending.lock().await;
        let (due, later): (Vec<_>, Vec<_>) = pending.drain(..).partition(|r| r.is_due(now));
        *pending = later;
        due
    }
}

/// Result of one reminder pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderTick {
    pub attempted: usize,
    pub delivered: usize,
}

/// Fires due reminders, one delivery attempt each.
pub struct ReminderLoop {
    queue: Arc<ReminderQueue>,
    sink: Arc<dyn DeliverySink>,
}

impl ReminderLoop {
    pub fn new(queue: Arc<ReminderQueue>, sink: Arc<dyn DeliverySink>) -> Self {
        Self { queue, sink }
    }

    /// Fire everything due at `now`.
    ///
    /// Due reminders leave the queue before delivery is attempted; a failed
    /// delivery is dropped.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> ReminderTick {
        let due = self.queue.take_due(now).await;
        let mut tick = ReminderTick {
            attempted: due.len(),
            delivered: 0,
        };

        for reminder in due {
            let text = format!(
                "{} reminder: {}",
                self.sink.mention(&reminder.owner_user_id),
                reminder.text
            );
            match self.sink.send(&reminder.channel_id, &text).await {
                Ok(()) => tick.delivered += 1,
                Err(e) => warn!(
                    reminder_id = %reminder.id,
                    channel_id = %reminder.channel_id,
                    error = %e,
                    "Reminder delivery failed, dropping"
                ),
            }
        }

        if tick.attempted > 0 {
            info!(attempted = tick.attempted, delivered = tick.delivered, "Reminders fired");
        }
        tick
    }
}

#[async_trait]
impl BackgroundTask for ReminderLoop {
    fn name(&self) -> &'static str {
        "reminders"
    }

    async fn run_once(&self) -> MindcordResult<()> {
        self.tick_at(Utc::now()).await;
        Ok(())
    }
}
