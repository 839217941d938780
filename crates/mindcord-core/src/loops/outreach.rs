//! Proactive outreach: occasionally start a conversation with a friend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use super::BackgroundTask;
use crate::config::OutreachConfig;
use crate::error::MindcordResult;
use crate::prompts;
use crate::store::EntityStore;
use crate::traits::{complete_within, DeliverySink, GenerationService};
use crate::types::{RelationshipLevel, UserProfile};

/// Opener used when the generation service cannot produce one.
pub fn template_opener(user: &UserProfile) -> String {
    match user.relationship_level {
        RelationshipLevel::Creator => format!(
            "hey {}, just checking in. anything fun going on today?",
            user.display_name
        ),
        RelationshipLevel::CloseFriend => format!(
            "yo {}, was just thinking about you. how's it going?",
            user.display_name
        ),
        _ => format!("hey {}! been a while, what've you been up to?", user.display_name),
    }
}

/// What one outreach pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutreachOutcome {
    /// Current mood is not outgoing.
    NotOutgoing,
    /// The per-cycle probability did not fire.
    NotTriggered,
    NoCandidates,
    /// The chosen user has no reachable channel.
    NoDestination { user_id: String },
    Sent { user_id: String, channel_id: String },
}

/// Periodically reaches out to an eligible user.
pub struct OutreachLoop {
    store: Arc<EntityStore>,
    generator: Arc<dyn GenerationService>,
    sink: Arc<dyn DeliverySink>,
    config: OutreachConfig,
    agent_name: String,
    deadline: Duration,
}

impl OutreachLoop {
    pub fn new(
        store: Arc<EntityStore>,
        generator: Arc<dyn GenerationService>,
        sink: Arc<dyn DeliverySink>,
        config: OutreachConfig,
        agent_name: impl Into<String>,
        deadline: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            sink,
            config,
            agent_name: agent_name.into(),
            deadline,
        }
    }

    fn is_candidate(&self, user: &UserProfile, now: DateTime<Utc>) -> bool {
        let min_idle = chrono::Duration::minutes(self.config.min_idle_minutes.max(0));
        user.relationship_level.is_outreach_eligible()
            && now - user.last_seen >= min_idle
            && user.last_checkin.map_or(true, |t| now - t >= min_idle)
    }

    /// Run one pass as of `now` with a caller-supplied RNG.
    ///
    /// Delivery is attempted at most once; a failure is returned to the loop
    /// boundary and not retried.
    pub async fn tick_with_rng<R: Rng + Send>(
        &self,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> MindcordResult<OutreachOutcome> {
        let personality = self.store.personality().await?;
        if !self.config.is_outgoing(&personality.main_mood) {
            return Ok(OutreachOutcome::NotOutgoing);
        }
        if rng.gen::<f64>() >= self.config.probability {
            return Ok(OutreachOutcome::NotTriggered);
        }

        let candidates: Vec<(String, UserProfile)> = self
            .store
            .users()
            .await?
            .into_iter()
            .filter(|(_, user)| self.is_candidate(user, now))
            .collect();
        let Some((user_id, user)) = candidates.choose(rng).cloned() else {
            debug!("No outreach candidates");
            return Ok(OutreachOutcome::NoCandidates);
        };

        let Some(channel_id) = self.resolve_destination(&user_id, &user).await? else {
            debug!(user_id = %user_id, "No destination for outreach");
            return Ok(OutreachOutcome::NoDestination { user_id });
        };

        let prompt = prompts::outreach_prompt(&self.agent_name, &personality, &user);
        let opener = match complete_within(self.generator.as_ref(), &prompt, self.deadline).await {
            Ok(completion) => completion.text,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Opener generation failed, using template");
                template_opener(&user)
            }
        };

        self.sink.send(&channel_id, &opener).await?;
        info!(
            user_id = %user_id,
            channel_id = %channel_id,
            relationship = %user.relationship_level,
            "Reached out"
        );

        if let Err(e) = self
            .store
            .update_existing_user(&user_id, |profile| profile.last_checkin = Some(now))
            .await
        {
            warn!(user_id = %user_id, error = %e, "Could not record check-in");
        }

        Ok(OutreachOutcome::Sent {
            user_id,
            channel_id,
        })
    }

    /// Private channel for close friends and the creator; otherwise the
    /// default channel of the first shared venue that has one.
    async fn resolve_destination(
        &self,
        user_id: &str,
        user: &UserProfile,
    ) -> MindcordResult<Option<String>> {
        if user.relationship_level.prefers_private_channel() {
            return self.sink.open_private_channel(user_id).await.map(Some);
        }

        let policy = &self.config.default_channels;
        for venue_id in &user.venues_shared {
            if let Some(channel_id) = policy.channels.get(venue_id) {
                return Ok(Some(channel_id.clone()));
            }
            let Some(name) = policy.fallback_channel_name.as_deref() else {
                continue;
            };
            match self.sink.venue_channels(venue_id).await {
                Ok(channels) => {
                    if let Some(channel) = channels.iter().find(|c| c.name.eq_ignore_ascii_case(name)) {
                        return Ok(Some(channel.id.clone()));
                    }
                }
                Err(e) => {
                    debug!(venue_id = %venue_id, error = %e, "Could not list venue channels");
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl BackgroundTask for OutreachLoop {
    fn name(&self) -> &'static str {
        "outreach"
    }

    async fn run_once(&self) -> MindcordResult<()> {
        let outcome = self
            .tick_with_rng(Utc::now(), &mut StdRng::from_entropy())
            .await?;
        debug!(?outcome, "Outreach pass complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultChannelPolicy;
    use crate::error::MindcordError;
    use crate::store::InMemoryStateStore;
    use crate::traits::{ChannelInfo, MockDeliverySink, MockGenerationService};

    fn config(policy: DefaultChannelPolicy) -> OutreachConfig {
        OutreachConfig {
            probability: 1.0,
            default_channels: policy,
            ..Default::default()
        }
    }

    async fn seeded_store(mood: &str, users: &[(&str, RelationshipLevel, &[&str])]) -> Arc<EntityStore> {
        let store = Arc::new(EntityStore::new(Arc::new(InMemoryStateStore::new())));
        let mood = mood.to_string();
        store
            .update_personality(move |p| p.main_mood = mood)
            .await
            .unwrap();
        let long_ago = Utc::now() - chrono::Duration::days(2);
        for (id, level, venues) in users {
            store
                .upsert_user(id, id, |p, _| {
                    p.relationship_level = *level;
                    p.last_seen = long_ago;
                    p.venues_shared = venues.iter().map(|v| v.to_string()).collect();
                })
                .await
                .unwrap();
        }
        store
    }

    fn generator_failing() -> MockGenerationService {
        let mut generator = MockGenerationService::new();
        generator
            .expect_complete()
            .returning(|_| Err(MindcordError::generation("offline")));
        generator.expect_model_name().return_const("mock".to_string());
        generator
    }

    #[tokio::test]
    async fn test_not_outgoing_mood_does_nothing() {
        let store = seeded_store("grumpy", &[("u1", RelationshipLevel::Friend, &["v1"])]).await;
        let mut sink = MockDeliverySink::new();
        sink.expect_send().never();
        let outreach = OutreachLoop::new(
            store,
            Arc::new(MockGenerationService::new()),
            Arc::new(sink),
            config(DefaultChannelPolicy::default()),
            "Mindcord",
            Duration::from_secs(1),
        );

        let outcome = outreach
            .tick_with_rng(Utc::now(), &mut StdRng::seed_from_u64(1))
            .await
            .unwrap();
        assert_eq!(outcome, OutreachOutcome::NotOutgoing);
    }

    #[tokio::test]
    async fn test_close_friend_gets_private_message_with_template_on_failure() {
        let store = seeded_store(
            "chatty",
            &[
                ("u1", RelationshipLevel::CloseFriend, &[]),
                ("u2", RelationshipLevel::New, &["v1"]),
            ],
        )
        .await;

        let mut sink = MockDeliverySink::new();
        sink.expect_open_private_channel()
            .withf(|user_id| user_id == "u1")
            .returning(|user_id| Ok(format!("dm:{}", user_id)));
        sink.expect_send()
            .withf(|channel, text| channel == "dm:u1" && text.contains("u1"))
            .times(1)
            .returning(|_, _| Ok(()));

        let outreach = OutreachLoop::new(
            store.clone(),
            Arc::new(generator_failing()),
            Arc::new(sink),
            config(DefaultChannelPolicy::default()),
            "Mindcord",
            Duration::from_secs(1),
        );
        let now = Utc::now();
        let outcome = outreach
            .tick_with_rng(now, &mut StdRng::seed_from_u64(1))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            OutreachOutcome::Sent {
                user_id: "u1".into(),
                channel_id: "dm:u1".into()
            }
        );
        let profile = store.user("u1").await.unwrap().unwrap();
        assert_eq!(profile.last_checkin, Some(now));
    }

    #[tokio::test]
    async fn test_friend_uses_named_default_channel() {
        let store = seeded_store("social", &[("u1", RelationshipLevel::Friend, &["v1", "v2"])]).await;

        let mut sink = MockDeliverySink::new();
        sink.expect_venue_channels().returning(|venue_id| {
            if venue_id == "v2" {
                Ok(vec![ChannelInfo::new("c-rules", "rules"), ChannelInfo::new("c-gen", "General")])
            } else {
                Ok(vec![ChannelInfo::new("c-x", "random")])
            }
        });
        sink.expect_send()
            .withf(|channel, text| channel == "c-gen" && text == "heyo, long time")
            .times(1)
            .returning(|_, _| Ok(()));

        let mut generator = MockGenerationService::new();
        generator
            .expect_complete()
            .returning(|_| Ok("heyo, long time".into()));

        let outreach = OutreachLoop::new(
            store,
            Arc::new(generator),
            Arc::new(sink),
            config(DefaultChannelPolicy::default().with_fallback_name("general")),
            "Mindcord",
            Duration::from_secs(1),
        );
        let outcome = outreach
            .tick_with_rng(Utc::now(), &mut StdRng::seed_from_u64(3))
            .await
            .unwrap();
        assert!(matches!(outcome, OutreachOutcome::Sent { ref channel_id, .. } if channel_id == "c-gen"));
    }

    #[tokio::test]
    async fn test_explicit_map_wins_and_missing_destination_skips() {
        let store = seeded_store("hyped", &[("u1", RelationshipLevel::Friend, &["v1"])]).await;

        let mut sink = MockDeliverySink::new();
        sink.expect_venue_channels().never();
        sink.expect_send().never();

        let outreach = OutreachLoop::new(
            store.clone(),
            Arc::new(MockGenerationService::new()),
            Arc::new(sink),
            config(DefaultChannelPolicy::default()),
            "Mindcord",
            Duration::from_secs(1),
        );
        let outcome = outreach
            .tick_with_rng(Utc::now(), &mut StdRng::seed_from_u64(3))
            .await
            .unwrap();
        assert_eq!(outcome, OutreachOutcome::NoDestination { user_id: "u1".into() });

        let mut sink = MockDeliverySink::new();
        sink.expect_send()
            .withf(|channel, _| channel == "c-mapped")
            .times(1)
            .returning(|_, _| Ok(()));
        let outreach = OutreachLoop::new(
            store,
            Arc::new(generator_failing()),
            Arc::new(sink),
            config(DefaultChannelPolicy::default().with_channel("v1", "c-mapped")),
            "Mindcord",
            Duration::from_secs(1),
        );
        let outcome = outreach
            .tick_with_rng(Utc::now(), &mut StdRng::seed_from_u64(3))
            .await
            .unwrap();
        assert!(matches!(outcome, OutreachOutcome::Sent { .. }));
    }

    #[tokio::test]
    async fn test_recently_seen_users_are_skipped() {
        let store = Arc::new(EntityStore::new(Arc::new(InMemoryStateStore::new())));
        store
            .update_personality(|p| p.main_mood = "bored".into())
            .await
            .unwrap();
        store
            .upsert_user("u1", "Sam", |p, _| p.relationship_level = RelationshipLevel::Creator)
            .await
            .unwrap();

        let outreach = OutreachLoop::new(
            store,
            Arc::new(MockGenerationService::new()),
            Arc::new(MockDeliverySink::new()),
            config(DefaultChannelPolicy::default()),
            "Mindcord",
            Duration::from_secs(1),
        );
        let outcome = outreach
            .tick_with_rng(Utc::now(), &mut StdRng::seed_from_u64(3))
            .await
            .unwrap();
        assert_eq!(outcome, OutreachOutcome::NoCandidates);
    }
}
