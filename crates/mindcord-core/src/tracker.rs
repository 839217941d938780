//! Relationship tracking: folds every inbound event into the user and venue
//! profiles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::CreatorIdentity;
use crate::error::MindcordResult;
use crate::store::EntityStore;
use crate::types::{InboundEvent, RelationshipLevel, UserProfile, VenueProfile};

/// What observing one event did to the stored profiles.
#[derive(Debug, Clone)]
pub struct Observation {
    /// The user profile after the update.
    pub user: UserProfile,
    pub user_created: bool,
    /// Tier before the update, when it changed.
    pub promoted_from: Option<RelationshipLevel>,
    /// The venue profile after the update, for in-venue events.
    pub venue: Option<VenueProfile>,
}

/// Updates user and venue profiles from inbound events.
pub struct RelationshipTracker {
    store: Arc<EntityStore>,
    creator: CreatorIdentity,
    topics: Vec<String>,
}

impl RelationshipTracker {
    pub fn new(store: Arc<EntityStore>, creator: CreatorIdentity) -> Self {
        Self {
            store,
            creator,
            topics: Vec::new(),
        }
    }

    /// Topics to note on a venue's profile when they come up there.
    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.topics = topics;
        self
    }

    /// Observe one event at the current time.
    pub async fn observe_event(&self, event: &InboundEvent) -> MindcordResult<Observation> {
        self.observe_event_at(event, Utc::now()).await
    }

    /// Observe one event at a given time.
    ///
    /// Replaying an event counts it again.
    pub async fn observe_event_at(
        &self,
        event: &InboundEvent,
        now: DateTime<Utc>,
    ) -> MindcordResult<Observation> {
        let is_creator = self
            .creator
            .matches(&event.author_id, &event.author_display_name);

        let (user, user_created, promoted_from) = self
            .store
            .upsert_user(&event.author_id, &event.author_display_name, |profile, created| {
                let before = profile.relationship_level;

                if !event.author_display_name.trim().is_empty() {
                    profile.display_name = event.author_display_name.clone();
                }
                profile.last_seen = now;
                profile.total_interactions += 1;
                if let Some(venue_id) = &event.venue_id {
                    profile.share_venue(venue_id);
                }
                profile.recompute_relationship();
                if is_creator {
                    profile.mark_creator();
                }

                let after = profile.relationship_level;
                let promoted_from = (after != before && !created).then_some(before);
                (profile.clone(), created, promoted_from)
            })
            .await?;

        if user_created {
            debug!(user_id = %event.author_id, name = %user.display_name, "New user profile");
        }
        if let Some(before) = promoted_from {
            info!(
                user_id = %event.author_id,
                from = %before,
                to = %user.relationship_level,
                interactions = user.total_interactions,
                "Relationship tier changed"
            );
        }

        let venue = match &event.venue_id {
            Some(venue_id) => Some(self.observe_venue(venue_id, event, now).await?),
            None => None,
        };

        Ok(Observation {
            user,
            user_created,
            promoted_from,
            venue,
        })
    }

    async fn observe_venue(
        &self,
        venue_id: &str,
        event: &InboundEvent,
        now: DateTime<Utc>,
    ) -> MindcordResult<VenueProfile> {
        let initial_name = event.venue_name.as_deref().unwrap_or(venue_id);
        self.store
            .upsert_venue(venue_id, initial_name, |venue, created| {
                if created {
                    debug!(venue_id = %venue_id, name = %venue.name, "New venue profile");
                }
                if let Some(name) = &event.venue_name {
                    venue.name = name.clone();
                }
                if let Some(count) = event.venue_member_count {
                    venue.member_count = count;
                }
                venue.last_active = now;
                let text = event.text.to_lowercase();
                for topic in &self.topics {
                    if text.contains(&topic.trim().to_lowercase()) && venue.add_topic(topic) {
                        debug!(venue_id = %venue_id, topic = %topic, "Venue topic noted");
                    }
                }
                venue.clone()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStateStore;

    fn tracker(creator: CreatorIdentity) -> (RelationshipTracker, Arc<EntityStore>) {
        let store = Arc::new(EntityStore::new(Arc::new(InMemoryStateStore::new())));
        (RelationshipTracker::new(store.clone(), creator), store)
    }

    #[tokio::test]
    async fn test_first_event_creates_profile() {
        let (tracker, _) = tracker(CreatorIdentity::default());
        let event = InboundEvent::private("u1", "Sam", "dm:u1", "hey");

        let obs = tracker.observe_event(&event).await.unwrap();
        assert!(obs.user_created);
        assert_eq!(obs.user.total_interactions, 1);
        assert_eq!(obs.user.relationship_level, RelationshipLevel::New);
        assert!(obs.venue.is_none());
    }

    #[tokio::test]
    async fn test_promotion_at_threshold() {
        let (tracker, _) = tracker(CreatorIdentity::default());
        let event = InboundEvent::in_venue("u1", "Sam", "v1", "c1", "hi");

        for _ in 0..10 {
            tracker.observe_event(&event).await.unwrap();
        }
        let obs = tracker.observe_event(&event).await.unwrap();
        assert_eq!(obs.user.total_interactions, 11);
        assert_eq!(obs.user.relationship_level, RelationshipLevel::Acquaintance);
        assert_eq!(obs.promoted_from, Some(RelationshipLevel::New));
    }

    #[tokio::test]
    async fn test_creator_override_by_display_name() {
        let creator = CreatorIdentity {
            user_id: None,
            display_name: Some("Maker".into()),
        };
        let (tracker, store) = tracker(creator);

        let event = InboundEvent::in_venue("9", "Maker", "v1", "c1", "yo");
        let obs = tracker.observe_event(&event).await.unwrap();
        assert_eq!(obs.user.relationship_level, RelationshipLevel::Creator);

        // Renamed later: still creator.
        let renamed = InboundEvent::in_venue("9", "NotMaker", "v1", "c1", "yo");
        tracker.observe_event(&renamed).await.unwrap();
        let stored = store.user("9").await.unwrap().unwrap();
        assert_eq!(stored.relationship_level, RelationshipLevel::Creator);
        assert_eq!(stored.display_name, "NotMaker");
    }

    #[tokio::test]
    async fn test_venue_notes_configured_topics() {
        let (tracker, _) = tracker(CreatorIdentity::default());
        let tracker = tracker.with_topics(vec!["rust".into(), "music".into()]);

        let event = InboundEvent::in_venue("u1", "Sam", "v1", "c1", "Rust 1.80 is out");
        tracker.observe_event(&event).await.unwrap();
        let event = InboundEvent::in_venue("u2", "Alex", "v1", "c1", "rust again, no music");
        let obs = tracker.observe_event(&event).await.unwrap();

        assert_eq!(obs.venue.unwrap().common_topics, vec!["rust", "music"]);
    }

    #[tokio::test]
    async fn test_venue_profile_tracks_metadata() {
        let (tracker, store) = tracker(CreatorIdentity::default());
        let event = InboundEvent::in_venue("u1", "Sam", "v1", "c1", "hi")
            .with_venue_info("Gaming Den", 42);
        tracker.observe_event(&event).await.unwrap();

        // Event without metadata keeps what is stored.
        let bare = InboundEvent::in_venue("u2", "Alex", "v1", "c1", "hi");
        let obs = tracker.observe_event(&bare).await.unwrap();
        let venue = obs.venue.unwrap();
        assert_eq!(venue.name, "Gaming Den");
        assert_eq!(venue.member_count, 42);
        assert_eq!(venue.culture, "learning");

        let user = store.user("u1").await.unwrap().unwrap();
        assert_eq!(user.venues_shared, vec!["v1"]);
    }

    #[tokio::test]
    async fn test_replay_double_counts() {
        let (tracker, _) = tracker(CreatorIdentity::default());
        let event = InboundEvent::private("u1", "Sam", "dm:u1", "hey");
        tracker.observe_event(&event).await.unwrap();
        let obs = tracker.observe_event(&event).await.unwrap();
        assert_eq!(obs.user.total_interactions, 2);
    }
}
