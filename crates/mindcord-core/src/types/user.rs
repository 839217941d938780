//! Per-user relationship and memory records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use super::personality::cap_front;

/// Ordered classification of familiarity with a user.
///
/// Ordering follows familiarity, so `Friend > Acquaintance` holds and
/// `Creator` sits above every derived tier.
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
pub enum RelationshipLevel {
    #[default]
    New,
    Acquaintance,
    Friend,
    CloseFriend,
    Creator,
}

impl RelationshipLevel {
    /// Derive the tier from an interaction count.
    ///
    /// Thresholds are strict: 11 interactions make an acquaintance, 51 a
    /// friend, 101 a close friend. Never returns `Creator`.
    pub fn from_interactions(total: u64) -> Self {
        match total {
            n if n > 100 => Self::CloseFriend,
            n if n > 50 => Self::Friend,
            n if n > 10 => Self::Acquaintance,
            _ => Self::New,
        }
    }

    /// Whether the agent may reach out to this user unprompted.
    pub fn is_outreach_eligible(&self) -> bool {
        matches!(self, Self::Friend | Self::CloseFriend | Self::Creator)
    }

    /// Whether outreach should go to a private channel rather than a venue.
    pub fn prefers_private_channel(&self) -> bool {
        matches!(self, Self::CloseFriend | Self::Creator)
    }
}

/// A user-supplied note the agent keeps about them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryNote {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// One replied-to exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub timestamp: DateTime<Utc>,
    pub inbound_len: usize,
    pub outbound_len: usize,
    pub mood_at_time: String,
    pub relationship_at_time: RelationshipLevel,
}

/// Everything the agent knows about one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub display_name: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub total_interactions: u64,
    pub relationship_level: RelationshipLevel,
    /// Venue ids, in order of first encounter.
    #[serde(default)]
    pub venues_shared: Vec<String>,
    #[serde(default)]
    pub custom_memories: Vec<MemoryNote>,
    /// Most recent last.
    #[serde(default)]
    pub interaction_log: Vec<InteractionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checkin: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Create a profile for a user seen for the first time.
    pub fn new(display_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            display_name: display_name.into(),
            first_seen: now,
            last_seen: now,
            total_interactions: 0,
            relationship_level: RelationshipLevel::New,
            venues_shared: Vec::new(),
            custom_memories: Vec::new(),
            interaction_log: Vec::new(),
            last_checkin: None,
        }
    }

    /// Recompute the tier from the current interaction count.
    ///
    /// `Creator` is sticky and is never replaced by a derived tier.
    pub fn recompute_relationship(&mut self) {
        if self.relationship_level == RelationshipLevel::Creator {
            return;
        }
        self.relationship_level = RelationshipLevel::from_interactions(self.total_interactions);
    }

    /// Apply the permanent creator override.
    pub fn mark_creator(&mut self) {
        self.relationship_level = RelationshipLevel::Creator;
    }

    /// Record a venue if it has not been seen with this user before.
    /// Returns true when the venue was new.
    pub fn share_venue(&mut self, venue_id: &str) -> bool {
        if self.venues_shared.iter().any(|v| v == venue_id) {
            return false;
        }
        self.venues_shared.push(venue_id.to_string());
        true
    }

    /// Store a memory about this user.
    pub fn remember(&mut self, text: impl Into<String>, now: DateTime<Utc>) {
        self.custom_memories.push(MemoryNote {
            text: text.into(),
            timestamp: now,
        });
    }

    /// Remove every memory containing `needle` (case-insensitive).
    ///
    /// Returns the number of memories removed. An empty needle removes nothing.
    pub fn forget(&mut self, needle: &str) -> usize {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return 0;
        }
        let before = self.custom_memories.len();
        self.custom_memories
            .retain(|m| !m.text.to_lowercase().contains(&needle));
        before - self.custom_memories.len()
    }

    /// The last `n` memories, oldest first.
    pub fn recent_memories(&self, n: usize) -> &[MemoryNote] {
        let start = self.custom_memories.len().saturating_sub(n);
        &self.custom_memories[start..]
    }

    /// Append to the interaction log, keeping the most recent `cap` entries.
    pub fn log_interaction(&mut self, record: InteractionRecord, cap: usize) {
        self.interaction_log.push(record);
        cap_front(&mut self.interaction_log, cap);
    }

    /// Trim the interaction log to `cap`. Returns the number removed.
    pub fn prune_interaction_log(&mut self, cap: usize) -> usize {
        let before = self.interaction_log.len();
        cap_front(&mut self.interaction_log, cap);
        before - self.interaction_log.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_table() {
        assert_eq!(RelationshipLevel::from_interactions(0), RelationshipLevel::New);
        assert_eq!(RelationshipLevel::from_interactions(10), RelationshipLevel::New);
        assert_eq!(RelationshipLevel::from_interactions(11), RelationshipLevel::Acquaintance);
        assert_eq!(RelationshipLevel::from_interactions(50), RelationshipLevel::Acquaintance);
        assert_eq!(RelationshipLevel::from_interactions(51), RelationshipLevel::Friend);
        assert_eq!(RelationshipLevel::from_interactions(100), RelationshipLevel::Friend);
        assert_eq!(RelationshipLevel::from_interactions(101), RelationshipLevel::CloseFriend);
    }

    #[test]
    fn test_tier_monotonic_in_count() {
        let mut previous = RelationshipLevel::New;
        for n in 0..300 {
            let tier = RelationshipLevel::from_interactions(n);
            assert!(tier >= previous, "tier dropped at {n}");
            previous = tier;
        }
    }

    #[test]
    fn test_creator_is_sticky() {
        let mut profile = UserProfile::new("maker", Utc::now());
        profile.mark_creator();
        profile.total_interactions = 3;
        profile.recompute_relationship();
        assert_eq!(profile.relationship_level, RelationshipLevel::Creator);
    }

    #[test]
    fn test_forget_is_case_insensitive_substring() {
        let now = Utc::now();
        let mut profile = UserProfile::new("sam", now);
        profile.remember("likes pizza", now);
        profile.remember("owns a cat", now);

        assert_eq!(profile.forget("PIZZA"), 1);
        assert_eq!(profile.custom_memories.len(), 1);
        assert_eq!(profile.custom_memories[0].text, "owns a cat");
    }

    #[test]
    fn test_forget_empty_needle_is_noop() {
        let now = Utc::now();
        let mut profile = UserProfile::new("sam", now);
        profile.remember("likes pizza", now);
        assert_eq!(profile.forget("  "), 0);
        assert_eq!(profile.custom_memories.len(), 1);
    }

    #[test]
    fn test_share_venue_dedupes() {
        let mut profile = UserProfile::new("sam", Utc::now());
        assert!(profile.share_venue("v1"));
        assert!(!profile.share_venue("v1"));
        assert!(profile.share_venue("v2"));
        assert_eq!(profile.venues_shared, vec!["v1", "v2"]);
    }

    #[test]
    fn test_interaction_log_bounded() {
        let now = Utc::now();
        let mut profile = UserProfile::new("sam", now);
        for i in 0..60 {
            profile.log_interaction(
                InteractionRecord {
                    timestamp: now,
                    inbound_len: i,
                    outbound_len: 1,
                    mood_at_time: "chill".into(),
                    relationship_at_time: RelationshipLevel::New,
                },
                50,
            );
        }
        assert_eq!(profile.interaction_log.len(), 50);
        assert_eq!(profile.interaction_log[0].inbound_len, 10);
    }

    #[test]
    fn test_relationship_serializes_snake_case() {
        let json = serde_json::to_string(&RelationshipLevel::CloseFriend).unwrap();
        assert_eq!(json, "\"close_friend\"");
        assert_eq!(RelationshipLevel::CloseFriend.to_string(), "close_friend");
    }
}
