//! Per-venue (server / community) records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Culture assigned to a venue until it is adapted.
pub const DEFAULT_CULTURE: &str = "learning";

/// What the agent knows about a venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueProfile {
    pub name: String,
    pub member_count: u64,
    pub last_active: DateTime<Utc>,
    pub culture: String,
    #[serde(default = "default_activity_level")]
    pub activity_level: String,
    /// How the agent sees its own role in this venue.
    #[serde(default = "default_role")]
    pub my_role: String,
    #[serde(default)]
    pub common_topics: Vec<String>,
    #[serde(default)]
    pub inside_jokes: Vec<String>,
}

fn default_activity_level() -> String {
    "medium".to_string()
}

fn default_role() -> String {
    "observer".to_string()
}

impl VenueProfile {
    /// Create a profile for a venue seen for the first time.
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            member_count: 0,
            last_active: now,
            culture: DEFAULT_CULTURE.to_string(),
            activity_level: default_activity_level(),
            my_role: default_role(),
            common_topics: Vec::new(),
            inside_jokes: Vec::new(),
        }
    }

    /// Add a topic unless it is already known (case-insensitive).
    pub fn add_topic(&mut self, topic: &str) -> bool {
        let topic = topic.trim();
        if topic.is_empty()
            || self
                .common_topics
                .iter()
                .any(|t| t.eq_ignore_ascii_case(topic))
        {
            return false;
        }
        self.common_topics.push(topic.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_venue_defaults() {
        let venue = VenueProfile::new("Gaming Den", Utc::now());
        assert_eq!(venue.culture, "learning");
        assert_eq!(venue.my_role, "observer");
        assert!(venue.common_topics.is_empty());
    }

    #[test]
    fn test_add_topic_dedupes() {
        let mut venue = VenueProfile::new("x", Utc::now());
        assert!(venue.add_topic("Rust"));
        assert!(!venue.add_topic("rust"));
        assert!(!venue.add_topic(""));
        assert_eq!(venue.common_topics, vec!["Rust"]);
    }

    #[test]
    fn test_missing_optional_fields_default_on_load() {
        let json = serde_json::json!({
            "name": "old",
            "member_count": 3,
            "last_active": "2024-01-01T00:00:00Z",
            "culture": "memes"
        });
        let venue: VenueProfile = serde_json::from_value(json).unwrap();
        assert_eq!(venue.my_role, "observer");
        assert_eq!(venue.activity_level, "medium");
    }
}
