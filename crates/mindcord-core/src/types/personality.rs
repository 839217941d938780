//! Global personality state: mood, energy, interests and passing thoughts.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The enumerated mood vocabulary. Moods outside this list are allowed
/// (custom moods), this is what gets offered to the generation service and
/// what the random mood source picks from.
pub const MOOD_VOCABULARY: &[&str] = &[
    "tired",
    "hyped",
    "chill",
    "annoyed",
    "happy",
    "bored",
    "stressed",
    "relaxed",
    "excited",
    "sleepy",
    "grumpy",
    "cheerful",
    "social",
    "antisocial",
    "chatty",
    "quiet",
    "friendly",
    "salty",
    "procrastinating",
    "motivated",
    "distracted",
    "focused",
    "lazy",
    "restless",
    "content",
    "anxious",
    "caffeinated",
    "hungry",
    "accomplished",
    "overwhelmed",
    "nostalgic",
    "creative",
    "brain-dead",
    "vibing",
    "curious",
];

/// Mood used when nothing else is known.
pub const DEFAULT_MOOD: &str = "chill";

/// Four-level energy intensity, orthogonal to mood.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EnergyLevel {
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

/// A past mood, recorded when it was replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub mood: String,
    pub timestamp: DateTime<Utc>,
}

/// A short passing thought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtEntry {
    pub thought: String,
    pub timestamp: DateTime<Utc>,
}

/// The single global personality record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityState {
    /// Current mood; never empty.
    pub main_mood: String,
    /// Optional secondary mood colouring the main one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_mood: Option<String>,
    pub energy_level: EnergyLevel,
    /// Free-form states layered on top of the mood ("caffeinated", "on a diet").
    #[serde(default)]
    pub custom_states: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    /// Most recent last.
    #[serde(default)]
    pub daily_thoughts: Vec<ThoughtEntry>,
    /// Most recent last.
    #[serde(default)]
    pub mood_history: Vec<MoodEntry>,
    pub last_mood_change: DateTime<Utc>,
}

impl Default for PersonalityState {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl PersonalityState {
    /// Create the initial personality.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            main_mood: DEFAULT_MOOD.to_string(),
            secondary_mood: None,
            energy_level: EnergyLevel::Medium,
            custom_states: Vec::new(),
            interests: vec!["gaming".to_string(), "tech".to_string(), "memes".to_string()],
            daily_thoughts: Vec::new(),
            mood_history: Vec::new(),
            last_mood_change: now,
        }
    }

    /// Replace the main mood.
    ///
    /// The previous mood is appended to the history first and the history is
    /// trimmed to `history_cap`. Blank moods and no-op changes are ignored.
    /// Returns true if the mood actually changed.
    pub fn change_mood(
        &mut self,
        new_mood: &str,
        now: DateTime<Utc>,
        history_cap: usize,
    ) -> bool {
        let new_mood = new_mood.trim();
        if new_mood.is_empty() || new_mood.eq_ignore_ascii_case(&self.main_mood) {
            return false;
        }

        self.mood_history.push(MoodEntry {
            mood: self.main_mood.clone(),
            timestamp: now,
        });
        cap_front(&mut self.mood_history, history_cap);

        self.main_mood = new_mood.to_string();
        self.last_mood_change = now;
        true
    }

    /// Record a passing thought, keeping only the most recent `cap`.
    pub fn add_thought(&mut self, thought: &str, now: DateTime<Utc>, cap: usize) {
        let thought = thought.trim();
        if thought.is_empty() {
            return;
        }
        self.daily_thoughts.push(ThoughtEntry {
            thought: thought.to_string(),
            timestamp: now,
        });
        cap_front(&mut self.daily_thoughts, cap);
    }

    /// The most recent thought, if any.
    pub fn current_thought(&self) -> Option<&str> {
        self.daily_thoughts.last().map(|t| t.thought.as_str())
    }

    /// The last `n` moods, oldest first.
    pub fn recent_moods(&self, n: usize) -> Vec<&str> {
        let start = self.mood_history.len().saturating_sub(n);
        self.mood_history[start..]
            .iter()
            .map(|e| e.mood.as_str())
            .collect()
    }

    /// Drop mood history entries older than `max_age` and beyond `cap`.
    ///
    /// Returns the number of entries removed.
    pub fn prune_mood_history(&mut self, now: DateTime<Utc>, max_age: Duration, cap: usize) -> usize {
        let before = self.mood_history.len();
        let cutoff = now - max_age;
        self.mood_history.retain(|e| e.timestamp > cutoff);
        cap_front(&mut self.mood_history, cap);
        before - self.mood_history.len()
    }

    /// Trim daily thoughts to `cap`. Returns the number removed.
    pub fn prune_thoughts(&mut self, cap: usize) -> usize {
        let before = self.daily_thoughts.len();
        cap_front(&mut self.daily_thoughts, cap);
        before - self.daily_thoughts.len()
    }

    /// Restore the never-empty mood invariant on records loaded from disk.
    pub fn normalize(&mut self) {
        if self.main_mood.trim().is_empty() {
            self.main_mood = DEFAULT_MOOD.to_string();
        }
    }
}

/// Keep only the last `cap` items of a most-recent-last list.
pub(crate) fn cap_front<T>(items: &mut Vec<T>, cap: usize) {
    if items.len() > cap {
        let excess = items.len() - cap;
        items.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_personality() {
        let p = PersonalityState::default();
        assert_eq!(p.main_mood, "chill");
        assert_eq!(p.energy_level, EnergyLevel::Medium);
        assert_eq!(p.interests, vec!["gaming", "tech", "memes"]);
        assert!(p.mood_history.is_empty());
    }

    #[test]
    fn test_change_mood_pushes_previous() {
        let now = Utc::now();
        let mut p = PersonalityState::new(now);
        assert!(p.change_mood("hyped", now, 20));
        assert_eq!(p.main_mood, "hyped");
        assert_eq!(p.mood_history.len(), 1);
        assert_eq!(p.mood_history[0].mood, "chill");
        assert_eq!(p.last_mood_change, now);
    }

    #[test]
    fn test_change_mood_rejects_blank_and_same() {
        let now = Utc::now();
        let mut p = PersonalityState::new(now);
        assert!(!p.change_mood("   ", now, 20));
        assert!(!p.change_mood("Chill", now, 20));
        assert_eq!(p.main_mood, "chill");
        assert!(p.mood_history.is_empty());
    }

    #[test]
    fn test_mood_history_bounded() {
        let now = Utc::now();
        let mut p = PersonalityState::new(now);
        for i in 0..50 {
            p.change_mood(&format!("mood-{i}"), now, 20);
        }
        assert_eq!(p.mood_history.len(), 20);
        assert_eq!(p.mood_history.last().unwrap().mood, "mood-48");
    }

    #[test]
    fn test_prune_mood_history_by_age() {
        let now = Utc::now();
        let mut p = PersonalityState::new(now);
        p.mood_history.push(MoodEntry {
            mood: "ancient".into(),
            timestamp: now - Duration::days(45),
        });
        p.mood_history.push(MoodEntry {
            mood: "recent".into(),
            timestamp: now - Duration::days(2),
        });

        let removed = p.prune_mood_history(now, Duration::days(30), 20);
        assert_eq!(removed, 1);
        assert_eq!(p.mood_history.len(), 1);
        assert_eq!(p.mood_history[0].mood, "recent");
    }

    #[test]
    fn test_thoughts_capped() {
        let now = Utc::now();
        let mut p = PersonalityState::new(now);
        for i in 0..15 {
            p.add_thought(&format!("thought {i}"), now, 10);
        }
        assert_eq!(p.daily_thoughts.len(), 10);
        assert_eq!(p.current_thought(), Some("thought 14"));
    }

    #[test]
    fn test_normalize_restores_mood() {
        let mut p = PersonalityState::default();
        p.main_mood = String::new();
        p.normalize();
        assert_eq!(p.main_mood, DEFAULT_MOOD);
    }

    #[test]
    fn test_energy_level_strings() {
        assert_eq!(EnergyLevel::VeryHigh.to_string(), "very_high");
        assert_eq!("low".parse::<EnergyLevel>().unwrap(), EnergyLevel::Low);
        assert!(EnergyLevel::High > EnergyLevel::Medium);
    }
}
