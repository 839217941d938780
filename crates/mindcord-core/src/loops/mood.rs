//! Mood evolution: energy from the time of day, mood from the configured
//! source.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, Timelike, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::BackgroundTask;
use crate::config::{MoodConfig, MoodSource, RetentionConfig};
use crate::error::{MindcordError, MindcordResult};
use crate::prompts::{self, MoodDecision};
use crate::store::EntityStore;
use crate::traits::{complete_within, GenerationService};
use crate::types::{EnergyLevel, PersonalityState, MOOD_VOCABULARY};

/// Energy for a local hour of day.
///
/// Morning (5-10) high, midday (11-13) very high, afternoon and evening
/// (14-21) medium, night (22-4) low.
pub fn energy_for_hour(hour: u32) -> EnergyLevel {
    match hour {
        5..=10 => EnergyLevel::High,
        11..=13 => EnergyLevel::VeryHigh,
        14..=21 => EnergyLevel::Medium,
        _ => EnergyLevel::Low,
    }
}

/// What one mood pass did.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodTick {
    pub previous_mood: String,
    pub mood: String,
    pub energy: EnergyLevel,
    pub changed: bool,
}

struct Proposal {
    mood: Option<String>,
    note: Option<String>,
}

/// Periodically drifts the personality's mood and energy.
pub struct MoodLoop {
    store: Arc<EntityStore>,
    generator: Arc<dyn GenerationService>,
    config: MoodConfig,
    retention: RetentionConfig,
    agent_name: String,
    deadline: Duration,
}

impl MoodLoop {
    pub fn new(
        store: Arc<EntityStore>,
        generator: Arc<dyn GenerationService>,
        config: MoodConfig,
        retention: RetentionConfig,
        agent_name: impl Into<String>,
        deadline: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            config,
            retention,
            agent_name: agent_name.into(),
            deadline,
        }
    }

    /// Run one pass as of `now`.
    ///
    /// Any failure while choosing a mood returns an error before anything is
    /// written, so the personality is unchanged for this cycle.
    pub async fn tick_at(&self, now: DateTime<Local>) -> MindcordResult<MoodTick> {
        let current = self.store.personality().await?;
        let proposal = match self.config.source {
            MoodSource::Generated => self.generated_proposal(&current, now).await?,
            MoodSource::Random => self.random_proposal(&current, &mut StdRng::from_entropy()),
        };

        let energy = energy_for_hour(now.hour());
        let stamp = now.with_timezone(&Utc);
        let history_cap = self.retention.mood_history_cap;
        let thoughts_cap = self.retention.thoughts_cap;

        let tick = self
            .store
            .update_personality(|p| {
                let previous_mood = p.main_mood.clone();
                p.energy_level = energy;
                let changed = match &proposal.mood {
                    Some(mood) => p.change_mood(mood, stamp, history_cap),
                    None => false,
                };
                if changed {
                    if let Some(note) = &proposal.note {
                        p.add_thought(note, stamp, thoughts_cap);
                    }
                }
                MoodTick {
                    previous_mood,
                    mood: p.main_mood.clone(),
                    energy,
                    changed,
                }
            })
            .await?;

        if tick.changed {
            info!(from = %tick.previous_mood, to = %tick.mood, energy = %tick.energy, "Mood changed");
        } else {
            debug!(mood = %tick.mood, energy = %tick.energy, "Mood unchanged");
        }
        Ok(tick)
    }

    async fn generated_proposal(
        &self,
        current: &PersonalityState,
        now: DateTime<Local>,
    ) -> MindcordResult<Proposal> {
        let prompt = prompts::mood_prompt(&self.agent_name, current, now);
        let answer = complete_within(self.generator.as_ref(), &prompt, self.deadline).await?;
        match prompts::parse_mood_decision(&answer.text) {
            Some(MoodDecision::Change { mood, note }) => Ok(Proposal {
                mood: Some(mood),
                note,
            }),
            Some(MoodDecision::Stay) => Ok(Proposal {
                mood: None,
                note: None,
            }),
            None => Err(MindcordError::generation(format!(
                "unrecognized mood decision: {:?}",
                answer.text.lines().next().unwrap_or_default()
            ))),
        }
    }

    fn random_proposal<R: Rng>(&self, current: &PersonalityState, rng: &mut R) -> Proposal {
        let mood = if rng.gen::<f64>() < self.config.random_change_probability {
            let candidates: Vec<&str> = MOOD_VOCABULARY
                .iter()
                .copied()
                .filter(|m| !m.eq_ignore_ascii_case(&current.main_mood))
                .collect();
            candidates.choose(rng).map(|m| m.to_string())
        } else {
            None
        };
        Proposal { mood, note: None }
    }
}

#[async_trait]
impl BackgroundTask for MoodLoop {
    fn name(&self) -> &'static str {
        "mood"
    }

    async fn run_once(&self) -> MindcordResult<()> {
        self.tick_at(Local::now()).await.map(|_| ())
    }
}
