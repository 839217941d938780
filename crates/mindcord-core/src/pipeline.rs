//! Response pipeline: thinking indicator, human-ish delay, generation,
//! chunked delivery, and interaction logging.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::config::{ResponseConfig, RetentionConfig};
use crate::prompts;
use crate::stats::EngineStats;
use crate::store::EntityStore;
use crate::traits::{complete_within, DeliverySink, GenerationService};
use crate::types::{InboundEvent, InteractionRecord, PersonalityState, UserProfile};

/// Utterances sent when generation fails, so the caller is never left
/// waiting in silence.
pub const FALLBACK_REPLIES: &[&str] = &[
    "my brain just lagged for a sec",
    "sorry, processing error lol",
    "uh, that broke something in my head",
    "technical difficulties, one moment",
];

/// Pick one fallback utterance.
pub fn fallback_reply() -> &'static str {
    FALLBACK_REPLIES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("technical difficulties, one moment")
}

/// What the pipeline ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    /// A generated reply was delivered in `chunks` messages.
    Delivered { chunks: usize, latency: Duration },
    /// Generation or delivery failed; a fallback utterance was sent.
    Fallback { text: &'static str },
    /// Nothing could be delivered at all.
    Undelivered,
}

/// Split text into chunks of at most `limit` characters.
///
/// Breaks at the last newline, then the last space, in the second half of
/// the window; otherwise cuts hard at the limit. Never splits a character.
pub fn split_chunks(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        if rest.chars().count() <= limit {
            chunks.push(rest.to_string());
            break;
        }
        let hard = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..hard];
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0 && i >= hard / 2)
            .unwrap_or(hard);

        let (head, tail) = rest.split_at(cut);
        chunks.push(head.trim_end().to_string());
        rest = tail.trim_start();
    }
    chunks
}

/// Turns a positive engagement decision into delivered messages.
pub struct ResponsePipeline {
    config: ResponseConfig,
    retention: RetentionConfig,
    agent_name: String,
    creator_name: Option<String>,
    generator: Arc<dyn GenerationService>,
    sink: Arc<dyn DeliverySink>,
    store: Arc<EntityStore>,
    stats: Arc<EngineStats>,
}

impl ResponsePipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ResponseConfig,
        retention: RetentionConfig,
        agent_name: impl Into<String>,
        creator_name: Option<String>,
        generator: Arc<dyn GenerationService>,
        sink: Arc<dyn DeliverySink>,
        store: Arc<EntityStore>,
        stats: Arc<EngineStats>,
    ) -> Self {
        Self {
            config,
            retention,
            agent_name: agent_name.into(),
            creator_name,
            generator,
            sink,
            store,
            stats,
        }
    }

    fn thinking_delay(&self) -> Duration {
        let (min, max) = self.config.thinking_delay_bounds();
        let secs = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        Duration::from_secs_f64(secs)
    }

    /// Reply to an event. Never returns an error: every failure ends in a
    /// fallback utterance or, if even that cannot be sent, `Undelivered`.
    pub async fn respond(
        &self,
        event: &InboundEvent,
        user: &UserProfile,
        personality: &PersonalityState,
    ) -> ReplyOutcome {
        if self.config.typing_indicator {
            if let Err(e) = self.sink.send_typing_indicator(&event.channel_id).await {
                debug!(channel_id = %event.channel_id, error = %e, "Typing indicator failed");
            }
        }

        let delay = self.thinking_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let prompt = prompts::response_prompt(
            &self.agent_name,
            self.creator_name.as_deref(),
            personality,
            user,
            event,
        );
        let completion =
            match complete_within(self.generator.as_ref(), &prompt, self.config.generation_timeout()).await {
                Ok(completion) => completion,
                Err(e) => {
                    self.stats.record_generation_failure();
                    warn!(
                        user_id = %event.author_id,
                        channel_id = %event.channel_id,
                        error = %e,
                        "Generation failed, sending fallback"
                    );
                    return self.send_fallback(&event.channel_id).await;
                }
            };
        self.stats.record_latency(completion.latency);

        let chunks = split_chunks(&completion.text, self.config.chunk_limit);
        let pacing = self.config.chunk_pacing();
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 && !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
            if let Err(e) = self.sink.send(&event.channel_id, chunk).await {
                warn!(channel_id = %event.channel_id, chunk = i, error = %e, "Delivery failed");
                if i == 0 {
                    return self.send_fallback(&event.channel_id).await;
                }
                // Part of the reply already went out; don't log a full exchange.
                return ReplyOutcome::Undelivered;
            }
        }
        self.stats.record_reply();

        self.log_interaction(event, &completion.text, personality).await;

        ReplyOutcome::Delivered {
            chunks: chunks.len(),
            latency: completion.latency,
        }
    }

    async fn send_fallback(&self, channel_id: &str) -> ReplyOutcome {
        let text = fallback_reply();
        match self.sink.send(channel_id, text).await {
            Ok(()) => {
                self.stats.record_fallback();
                ReplyOutcome::Fallback { text }
            }
            Err(e) => {
                warn!(channel_id = %channel_id, error = %e, "Fallback delivery failed");
                ReplyOutcome::Undelivered
            }
        }
    }

    async fn log_interaction(&self, event: &InboundEvent, reply: &str, personality: &PersonalityState) {
        let cap = self.retention.interaction_log_cap;
        let mood = personality.main_mood.clone();
        let result = self
            .store
            .update_existing_user(&event.author_id, |profile| {
                profile.log_interaction(
                    InteractionRecord {
                        timestamp: Utc::now(),
                        inbound_len: event.text.chars().count(),
                        outbound_len: reply.chars().count(),
                        mood_at_time: mood,
                        relationship_at_time: profile.relationship_level,
                    },
                    cap,
                );
            })
            .await;

        if let Err(e) = result {
            self.stats.record_storage_failure();
            warn!(user_id = %event.author_id, error = %e, "Could not record interaction");
        }
    }
}
