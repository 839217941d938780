//! Engagement decisions: whether to answer an inbound event.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::{DecisionMode, EngagementConfig, ScoringTable};
use crate::prompts;
use crate::traits::{complete_within, GenerationService};
use crate::types::{InboundEvent, PersonalityState, UserProfile};

/// Each additive term of the response probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub mood: f64,
    pub energy: f64,
    pub relationship: f64,
    pub keyword: f64,
}

impl ScoreBreakdown {
    /// Compute the terms for an event.
    pub fn compute(
        table: &ScoringTable,
        event: &InboundEvent,
        user: &UserProfile,
        personality: &PersonalityState,
    ) -> Self {
        Self {
            base: table.base_rate,
            mood: table.mood_bonus(&personality.main_mood),
            energy: table.energy_bonus(personality.energy_level),
            relationship: table.relationship_bonus(user.relationship_level),
            keyword: if table.mentions_interesting_topic(&event.text) {
                table.keyword_bonus
            } else {
                0.0
            },
        }
    }

    /// Sum of the terms, clamped to `[0, 1]`.
    pub fn probability(&self) -> f64 {
        let p = self.base + self.mood + self.energy + self.relationship + self.keyword;
        if p.is_nan() {
            return 0.0;
        }
        p.clamp(0.0, 1.0)
    }
}

/// How a decision was reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecisionBasis {
    /// Mention or private channel.
    Mandatory,
    /// Uniform sample `roll` compared against `probability`.
    Heuristic { probability: f64, roll: f64 },
    /// The generation service answered.
    Delegated,
}

/// Outcome of the engagement decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub respond: bool,
    pub basis: DecisionBasis,
}

impl Decision {
    fn mandatory() -> Self {
        Self {
            respond: true,
            basis: DecisionBasis::Mandatory,
        }
    }
}

/// Decides whether the agent answers an event.
pub struct EngagementDecider {
    config: EngagementConfig,
    agent_name: String,
}

impl EngagementDecider {
    pub fn new(config: EngagementConfig, agent_name: impl Into<String>) -> Self {
        Self {
            config,
            agent_name: agent_name.into(),
        }
    }

    pub fn scoring(&self) -> &ScoringTable {
        &self.config.scoring
    }

    /// Response probability for an event that does not demand a reply.
    pub fn probability(
        &self,
        event: &InboundEvent,
        user: &UserProfile,
        personality: &PersonalityState,
    ) -> f64 {
        ScoreBreakdown::compute(&self.config.scoring, event, user, personality).probability()
    }

    /// Heuristic decision using the thread-local RNG.
    pub fn decide(
        &self,
        event: &InboundEvent,
        user: &UserProfile,
        personality: &PersonalityState,
    ) -> bool {
        self.decide_with_rng(event, user, personality, &mut rand::thread_rng())
            .respond
    }

    /// Heuristic decision with an explicit RNG.
    pub fn decide_with_rng<R: Rng>(
        &self,
        event: &InboundEvent,
        user: &UserProfile,
        personality: &PersonalityState,
        rng: &mut R,
    ) -> Decision {
        if event.demands_reply() {
            return Decision::mandatory();
        }
        let probability = self.probability(event, user, personality);
        let roll: f64 = rng.gen();
        Decision {
            respond: roll < probability,
            basis: DecisionBasis::Heuristic { probability, roll },
        }
    }

    /// Decide according to the configured mode.
    ///
    /// In delegated mode a failed or timed-out generation call falls back to
    /// the heuristic; this never returns an error.
    pub async fn decide_with_mode(
        &self,
        event: &InboundEvent,
        user: &UserProfile,
        personality: &PersonalityState,
        generator: &dyn GenerationService,
        deadline: Duration,
    ) -> Decision {
        if event.demands_reply() {
            return Decision::mandatory();
        }
        if self.config.mode == DecisionMode::Heuristic {
            return self.decide_with_rng(event, user, personality, &mut rand::thread_rng());
        }

        let prompt = prompts::decision_prompt(&self.agent_name, personality, user, event);
        match complete_within(generator, &prompt, deadline).await {
            Ok(answer) => {
                let respond = prompts::parse_yes_no(&answer.text);
                debug!(respond, latency_ms = answer.latency.as_millis() as u64, "Delegated decision");
                Decision {
                    respond,
                    basis: DecisionBasis::Delegated,
                }
            }
            Err(e) => {
                warn!(error = %e, "Delegated decision failed, using heuristic");
                self.decide_with_rng(event, user, personality, &mut rand::thread_rng())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MindcordError;
    use crate::traits::MockGenerationService;
    use crate::types::{EnergyLevel, RelationshipLevel};
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn decider(mode: DecisionMode) -> EngagementDecider {
        EngagementDecider::new(
            EngagementConfig {
                mode,
                scoring: ScoringTable::default(),
            },
            "Mindcord",
        )
    }

    fn venue_event(text: &str) -> InboundEvent {
        InboundEvent::in_venue("u1", "Sam", "v1", "c1", text)
    }

    #[test]
    fn test_mentions_and_private_always_respond() {
        let decider = decider(DecisionMode::Heuristic);
        let now = Utc::now();
        let user = UserProfile::new("Sam", now);
        let mut personality = PersonalityState::new(now);
        personality.main_mood = "antisocial".into();
        personality.energy_level = EnergyLevel::Low;

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let mention = venue_event("hi").mentioning_agent();
            assert!(decider.decide_with_rng(&mention, &user, &personality, &mut rng).respond);
            let dm = InboundEvent::private("u1", "Sam", "dm", "hi");
            assert!(decider.decide_with_rng(&dm, &user, &personality, &mut rng).respond);
        }
    }

    #[test]
    fn test_score_terms_add_up() {
        let now = Utc::now();
        let mut user = UserProfile::new("Sam", now);
        user.relationship_level = RelationshipLevel::Friend;
        let mut personality = PersonalityState::new(now);
        personality.main_mood = "chatty".into();
        personality.energy_level = EnergyLevel::High;

        let breakdown = ScoreBreakdown::compute(
            &ScoringTable::default(),
            &venue_event("new game and new tech"),
            &user,
            &personality,
        );
        assert_eq!(breakdown.keyword, 0.20);
        let expected = 0.05 + 0.10 + 0.04 + 0.10 + 0.20;
        assert!((breakdown.probability() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_probability_is_clamped() {
        let mut table = ScoringTable::default();
        table.base_rate = 0.9;
        table.keyword_bonus = 0.9;
        let decider = EngagementDecider::new(
            EngagementConfig {
                mode: DecisionMode::Heuristic,
                scoring: table,
            },
            "Mindcord",
        );
        let now = Utc::now();
        let mut user = UserProfile::new("Sam", now);
        user.relationship_level = RelationshipLevel::Creator;
        let mut personality = PersonalityState::new(now);
        personality.main_mood = "hyped".into();
        personality.energy_level = EnergyLevel::VeryHigh;

        let p = decider.probability(&venue_event("gaming memes"), &user, &personality);
        assert_eq!(p, 1.0);

        let mut negative = ScoringTable::default();
        negative.base_rate = -3.0;
        let breakdown = ScoreBreakdown::compute(&negative, &venue_event("x"), &user, &personality);
        assert_eq!(breakdown.probability(), 0.0);
    }

    #[test]
    fn test_heuristic_rate_tracks_probability() {
        let decider = decider(DecisionMode::Heuristic);
        let now = Utc::now();
        let user = UserProfile::new("Sam", now);
        let personality = PersonalityState::new(now);
        let event = venue_event("lunch?");
        // chill, medium, new, no keyword
        let p = decider.probability(&event, &user, &personality);
        assert!((p - 0.07).abs() < 1e-9);

        let mut rng = StdRng::seed_from_u64(42);
        let hits = (0..20_000)
            .filter(|_| decider.decide_with_rng(&event, &user, &personality, &mut rng).respond)
            .count();
        let rate = hits as f64 / 20_000.0;
        assert!((rate - 0.07).abs() < 0.01, "rate was {rate}");
    }

    #[tokio::test]
    async fn test_delegated_yes() {
        let decider = decider(DecisionMode::Delegated);
        let mut service = MockGenerationService::new();
        service
            .expect_complete()
            .times(1)
            .returning(|_| Ok("yes - they asked me directly".into()));

        let now = Utc::now();
        let decision = decider
            .decide_with_mode(
                &venue_event("hmm"),
                &UserProfile::new("Sam", now),
                &PersonalityState::new(now),
                &service,
                Duration::from_secs(1),
            )
            .await;
        assert_eq!(
            decision,
            Decision {
                respond: true,
                basis: DecisionBasis::Delegated
            }
        );
    }

    #[tokio::test]
    async fn test_delegated_failure_falls_back() {
        let decider = decider(DecisionMode::Delegated);
        let mut service = MockGenerationService::new();
        service
            .expect_complete()
            .returning(|_| Err(MindcordError::generation("quota exceeded")));

        let now = Utc::now();
        let decision = decider
            .decide_with_mode(
                &venue_event("hmm"),
                &UserProfile::new("Sam", now),
                &PersonalityState::new(now),
                &service,
                Duration::from_secs(1),
            )
            .await;
        assert!(matches!(decision.basis, DecisionBasis::Heuristic { .. }));
    }

    #[tokio::test]
    async fn test_delegated_skips_service_for_mentions() {
        let decider = decider(DecisionMode::Delegated);
        let mut service = MockGenerationService::new();
        service.expect_complete().never();

        let now = Utc::now();
        let decision = decider
            .decide_with_mode(
                &venue_event("hey").mentioning_agent(),
                &UserProfile::new("Sam", now),
                &PersonalityState::new(now),
                &service,
                Duration::from_secs(1),
            )
            .await;
        assert_eq!(decision.basis, DecisionBasis::Mandatory);
    }
}
