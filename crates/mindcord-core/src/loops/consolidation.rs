//! Retention pass over personality and user records.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::BackgroundTask;
use crate::config::RetentionConfig;
use crate::error::MindcordResult;
use crate::store::EntityStore;

/// What one consolidation pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationReport {
    pub moods_pruned: usize,
    pub thoughts_pruned: usize,
    pub users_scanned: usize,
    pub interactions_pruned: usize,
    /// Users whose record could not be rewritten.
    pub failed_users: Vec<String>,
}

/// Trims bounded histories back to their retention limits.
pub struct ConsolidationLoop {
    store: Arc<EntityStore>,
    retention: RetentionConfig,
}

impl ConsolidationLoop {
    pub fn new(store: Arc<EntityStore>, retention: RetentionConfig) -> Self {
        Self { store, retention }
    }

    /// Run one pass as of `now`.
    ///
    /// A user record that fails to save is reported and skipped; only a
    /// failure on the personality record or the user listing aborts the pass.
    pub async fn consolidate_at(&self, now: DateTime<Utc>) -> MindcordResult<ConsolidationReport> {
        let retention = &self.retention;
        let (moods_pruned, thoughts_pruned) = self
            .store
            .update_personality(|p| {
                (
                    p.prune_mood_history(
                        now,
                        retention.mood_history_max_age(),
                        retention.mood_history_cap,
                    ),
                    p.prune_thoughts(retention.thoughts_cap),
                )
            })
            .await?;

        let mut report = ConsolidationReport {
            moods_pruned,
            thoughts_pruned,
            ..Default::default()
        };

        for user_id in self.store.user_ids().await? {
            report.users_scanned += 1;
            let cap = retention.interaction_log_cap;
            match self
                .store
                .update_existing_user(&user_id, |profile| profile.prune_interaction_log(cap))
                .await
            {
                Ok(pruned) => report.interactions_pruned += pruned.unwrap_or(0),
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Skipping user during consolidation");
                    report.failed_users.push(user_id);
                }
            }
        }

        info!(
            moods_pruned = report.moods_pruned,
            thoughts_pruned = report.thoughts_pruned,
            users_scanned = report.users_scanned,
            interactions_pruned = report.interactions_pruned,
            failed = report.failed_users.len(),
            "Consolidation complete"
        );
        Ok(report)
    }
}

#[async_trait]
impl BackgroundTask for ConsolidationLoop {
    fn name(&self) -> &'static str {
        "consolidation"
    }

    async fn run_once(&self) -> MindcordResult<()> {
        self.consolidate_at(Utc::now()).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStateStore, RecordKind, StateStore};
    use crate::types::{InteractionRecord, MoodEntry, RelationshipLevel};

    fn record(now: DateTime<Utc>) -> InteractionRecord {
        InteractionRecord {
            timestamp: now,
            inbound_len: 1,
            outbound_len: 1,
            mood_at_time: "chill".into(),
            relationship_at_time: RelationshipLevel::New,
        }
    }

    #[tokio::test]
    async fn test_prunes_old_moods_and_long_logs() {
        let backend = Arc::new(InMemoryStateStore::new());
        let store = Arc::new(EntityStore::new(backend.clone()));
        let now = Utc::now();

        store
            .update_personality(|p| {
                p.mood_history.push(MoodEntry {
                    mood: "ancient".into(),
                    timestamp: now - chrono::Duration::days(45),
                });
                for i in 0..25 {
                    p.mood_history.push(MoodEntry {
                        mood: format!("m{i}"),
                        timestamp: now - chrono::Duration::hours(25 - i),
                    });
                }
                for i in 0..15 {
                    p.daily_thoughts.push(crate::types::ThoughtEntry {
                        thought: format!("t{i}"),
                        timestamp: now,
                    });
                }
            })
            .await
            .unwrap();
        store
            .upsert_user("u1", "Sam", |p, _| p.interaction_log = (0..80).map(|_| record(now)).collect())
            .await
            .unwrap();
        store
            .upsert_user("u2", "Alex", |p, _| p.interaction_log = vec![record(now)])
            .await
            .unwrap();

        let consolidation = ConsolidationLoop::new(store.clone(), RetentionConfig::default());
        let report = consolidation.consolidate_at(now).await.unwrap();

        assert_eq!(report.moods_pruned, 6);
        assert_eq!(report.thoughts_pruned, 5);
        assert_eq!(report.users_scanned, 2);
        assert_eq!(report.interactions_pruned, 30);
        assert!(report.failed_users.is_empty());

        let p = store.personality().await.unwrap();
        assert_eq!(p.mood_history.len(), 20);
        assert_eq!(p.mood_history[0].mood, "m5");
        assert_eq!(store.user("u1").await.unwrap().unwrap().interaction_log.len(), 50);

        let again = consolidation.consolidate_at(now).await.unwrap();
        assert_eq!(again.moods_pruned + again.thoughts_pruned + again.interactions_pruned, 0);

        // Records are still valid JSON in the backend after rewriting.
        assert!(backend.load(RecordKind::User, "u1").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_corrupted_user_is_reported_not_fatal() {
        let backend = Arc::new(InMemoryStateStore::new());
        backend
            .save(RecordKind::User, "broken", &serde_json::json!({"nope": true}))
            .unwrap();
        let store = Arc::new(EntityStore::new(backend));
        store.upsert_user("u1", "Sam", |_, _| ()).await.unwrap();

        let report = ConsolidationLoop::new(store, RetentionConfig::default())
            .consolidate_at(Utc::now())
            .await
            .unwrap();
        assert_eq!(report.users_scanned, 2);
        assert_eq!(report.failed_users, vec!["broken".to_string()]);
    }
}
