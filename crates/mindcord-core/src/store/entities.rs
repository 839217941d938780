//! Typed, key-serialized access to personality, user and venue records.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::warn;

use super::{RecordKind, StateStore};
use crate::error::{MindcordError, MindcordResult};
use crate::types::{PersonalityState, UserProfile, VenueProfile};

/// Id of the single global personality record.
pub const PERSONALITY_ID: &str = "global";

/// Entity access layer over a [`StateStore`].
///
/// Every read-modify-write runs under a lock scoped to its `(kind, id)` key,
/// so the reactive path and the background loops never lose each other's
/// updates to the same user. Different keys proceed independently.
pub struct EntityStore {
    backend: Arc<dyn StateStore>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl EntityStore {
    /// Wrap a backend.
    pub fn new(backend: Arc<dyn StateStore>) -> Self {
        Self {
            backend,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The raw backend.
    pub fn backend(&self) -> &Arc<dyn StateStore> {
        &self.backend
    }

    async fn lock(&self, kind: RecordKind, id: &str) -> OwnedMutexGuard<()> {
        let key = format!("{}:{}", kind.as_str(), id);
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(key)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    fn load_typed<T: DeserializeOwned>(
        &self,
        kind: RecordKind,
        id: &str,
    ) -> MindcordResult<Option<T>> {
        match self.backend.load(kind, id)? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                MindcordError::storage_corrupted(format!(
                    "{} record '{}' does not decode: {}",
                    kind, id, e
                ))
            }),
            None => Ok(None),
        }
    }

    fn save_typed<T: Serialize>(&self, kind: RecordKind, id: &str, record: &T) -> MindcordResult<()> {
        let value = serde_json::to_value(record)?;
        self.backend.save(kind, id, &value)
    }

    // ---- personality ----

    /// Current personality, or the default one if none has been stored yet.
    pub async fn personality(&self) -> MindcordResult<PersonalityState> {
        let mut personality = self
            .load_typed::<PersonalityState>(RecordKind::Personality, PERSONALITY_ID)?
            .unwrap_or_default();
        personality.normalize();
        Ok(personality)
    }

    /// Load the personality, creating and saving the default if absent.
    pub async fn ensure_personality(&self) -> MindcordResult<PersonalityState> {
        let _guard = self.lock(RecordKind::Personality, PERSONALITY_ID).await;
        if let Some(mut existing) =
            self.load_typed::<PersonalityState>(RecordKind::Personality, PERSONALITY_ID)?
        {
            existing.normalize();
            return Ok(existing);
        }
        let personality = PersonalityState::new(Utc::now());
        self.save_typed(RecordKind::Personality, PERSONALITY_ID, &personality)?;
        tracing::info!(mood = %personality.main_mood, "Created default personality");
        Ok(personality)
    }

    /// Mutate the personality under its lock and write it back.
    pub async fn update_personality<F, R>(&self, f: F) -> MindcordResult<R>
    where
        F: FnOnce(&mut PersonalityState) -> R,
    {
        let _guard = self.lock(RecordKind::Personality, PERSONALITY_ID).await;
        let mut personality = self
            .load_typed::<PersonalityState>(RecordKind::Personality, PERSONALITY_ID)?
            .unwrap_or_default();
        personality.normalize();
        let out = f(&mut personality);
        personality.normalize();
        self.save_typed(RecordKind::Personality, PERSONALITY_ID, &personality)?;
        Ok(out)
    }

    // ---- users ----

    /// Load a user profile.
    pub async fn user(&self, user_id: &str) -> MindcordResult<Option<UserProfile>> {
        self.load_typed(RecordKind::User, user_id)
    }

    /// Mutate a user profile, creating it first if absent.
    ///
    /// The closure receives the profile and whether it was just created.
    pub async fn upsert_user<F, R>(
        &self,
        user_id: &str,
        display_name: &str,
        f: F,
    ) -> MindcordResult<R>
    where
        F: FnOnce(&mut UserProfile, bool) -> R,
    {
        let _guard = self.lock(RecordKind::User, user_id).await;
        let (mut profile, created) = match self.load_typed::<UserProfile>(RecordKind::User, user_id)? {
            Some(profile) => (profile, false),
            None => (UserProfile::new(display_name, Utc::now()), true),
        };
        let out = f(&mut profile, created);
        self.save_typed(RecordKind::User, user_id, &profile)?;
        Ok(out)
    }

    /// Mutate an existing user profile. Returns `None` without writing if
    /// the user has never been seen.
    pub async fn update_existing_user<F, R>(&self, user_id: &str, f: F) -> MindcordResult<Option<R>>
    where
        F: FnOnce(&mut UserProfile) -> R,
    {
        let _guard = self.lock(RecordKind::User, user_id).await;
        let Some(mut profile) = self.load_typed::<UserProfile>(RecordKind::User, user_id)? else {
            return Ok(None);
        };
        let out = f(&mut profile);
        self.save_typed(RecordKind::User, user_id, &profile)?;
        Ok(Some(out))
    }

    /// Ids of every stored user.
    pub async fn user_ids(&self) -> MindcordResult<Vec<String>> {
        self.backend.list_ids(RecordKind::User)
    }

    /// Every stored user profile. Records that fail to decode are skipped.
    pub async fn users(&self) -> MindcordResult<Vec<(String, UserProfile)>> {
        let mut users = Vec::new();
        for id in self.backend.list_ids(RecordKind::User)? {
            match self.load_typed::<UserProfile>(RecordKind::User, &id) {
                Ok(Some(profile)) => users.push((id, profile)),
                Ok(None) => {}
                Err(e) => warn!(user_id = %id, error = %e, "Skipping unreadable user record"),
            }
        }
        Ok(users)
    }

    // ---- venues ----

    /// Load a venue profile.
    pub async fn venue(&self, venue_id: &str) -> MindcordResult<Option<VenueProfile>> {
        self.load_typed(RecordKind::Venue, venue_id)
    }

    /// Mutate a venue profile, creating it first if absent.
    pub async fn upsert_venue<F, R>(&self, venue_id: &str, name: &str, f: F) -> MindcordResult<R>
    where
        F: FnOnce(&mut VenueProfile, bool) -> R,
    {
        let _guard = self.lock(RecordKind::Venue, venue_id).await;
        let (mut venue, created) = match self.load_typed::<VenueProfile>(RecordKind::Venue, venue_id)? {
            Some(venue) => (venue, false),
            None => (VenueProfile::new(name, Utc::now()), true),
        };
        let out = f(&mut venue, created);
        self.save_typed(RecordKind::Venue, venue_id, &venue)?;
        Ok(out)
    }

    /// Ids of every stored venue.
    pub async fn venue_ids(&self) -> MindcordResult<Vec<String>> {
        self.backend.list_ids(RecordKind::Venue)
    }
}
