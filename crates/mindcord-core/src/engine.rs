//! The engine: consumes inbound events and exposes the user-facing
//! operations over the shared state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::commands::{self, Command, CommandKind, Invocation};
use crate::config::EngineConfig;
use crate::engagement::{Decision, EngagementDecider};
use crate::error::{MindcordError, MindcordResult};
use crate::loops::{LoopStatsSet, ReminderQueue};
use crate::pipeline::{ReplyOutcome, ResponsePipeline};
use crate::stats::{EngineStats, EngineStatsSnapshot, LoopStatsSnapshot};
use crate::store::{open_state_store, EntityStore, StateStore};
use crate::tracker::RelationshipTracker;
use crate::traits::{DeliverySink, GenerationService};
use crate::types::{
    EnergyLevel, InboundEvent, MemoryNote, PersonalityState, Reminder, UserProfile, VenueProfile,
};

/// Current mood as shown to users.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodReport {
    pub main_mood: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_mood: Option<String>,
    pub energy_level: EnergyLevel,
    pub custom_states: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_thought: Option<String>,
    pub last_mood_change: DateTime<Utc>,
    /// Up to five previous moods, oldest first.
    pub recent_moods: Vec<String>,
}

impl From<&PersonalityState> for MoodReport {
    fn from(p: &PersonalityState) -> Self {
        Self {
            main_mood: p.main_mood.clone(),
            secondary_mood: p.secondary_mood.clone(),
            energy_level: p.energy_level,
            custom_states: p.custom_states.clone(),
            current_thought: p.current_thought().map(str::to_string),
            last_mood_change: p.last_mood_change,
            recent_moods: p.recent_moods(5).into_iter().map(str::to_string).collect(),
        }
    }
}

/// Aggregate engine status.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub agent_name: String,
    pub model: String,
    pub storage_backend: String,
    pub uptime_secs: u64,
    pub mood: String,
    pub energy_level: EnergyLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_thought: Option<String>,
    pub users: usize,
    pub venues: usize,
    pub pending_reminders: usize,
    pub engine: EngineStatsSnapshot,
    pub loops: BTreeMap<String, LoopStatsSnapshot>,
}

/// What handling one inbound event did.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Authored by the agent itself.
    Ignored,
    /// A command was executed and its reply sent (or not).
    Command { kind: CommandKind, delivered: bool },
    /// The engagement decision said no.
    Skipped(Decision),
    Replied {
        decision: Decision,
        reply: ReplyOutcome,
    },
}

/// The personality and engagement engine.
pub struct Engine {
    config: EngineConfig,
    store: Arc<EntityStore>,
    tracker: RelationshipTracker,
    decider: EngagementDecider,
    pipeline: ResponsePipeline,
    reminders: Arc<ReminderQueue>,
    generator: Arc<dyn GenerationService>,
    sink: Arc<dyn DeliverySink>,
    stats: Arc<EngineStats>,
    loop_stats: LoopStatsSet,
    started: Instant,
}

impl Engine {
    /// Create an engine over an already opened backend.
    ///
    /// The personality record is created with defaults if absent. A storage
    /// failure at this point is logged, not fatal.
    pub async fn new(
        config: EngineConfig,
        backend: Arc<dyn StateStore>,
        generator: Arc<dyn GenerationService>,
        sink: Arc<dyn DeliverySink>,
    ) -> MindcordResult<Self> {
        config.validate()?;

        let store = Arc::new(EntityStore::new(backend));
        let stats = Arc::new(EngineStats::new());
        let creator_name = config.creator.display_name.clone();

        let tracker = RelationshipTracker::new(store.clone(), config.creator.clone())
            .with_topics(config.engagement.scoring.interesting_topics.clone());
        let decider = EngagementDecider::new(config.engagement.clone(), config.agent_name.clone());
        let pipeline = ResponsePipeline::new(
            config.response.clone(),
            config.retention.clone(),
            config.agent_name.clone(),
            creator_name,
            generator.clone(),
            sink.clone(),
            store.clone(),
            stats.clone(),
        );
        let reminders = Arc::new(ReminderQueue::new(config.reminders.max_horizon_minutes));

        match store.ensure_personality().await {
            Ok(p) => debug!(mood = %p.main_mood, energy = %p.energy_level, "Personality loaded"),
            Err(e) => warn!(error = %e, "Could not initialize personality record"),
        }

        info!(
            agent = %config.agent_name,
            backend = store.backend().backend_name(),
            model = generator.model_name(),
            mode = ?config.engagement.mode,
            "Engine ready"
        );

        Ok(Self {
            config,
            store,
            tracker,
            decider,
            pipeline,
            reminders,
            generator,
            sink,
            stats,
            loop_stats: LoopStatsSet::default(),
            started: Instant::now(),
        })
    }

    /// Create an engine, opening the storage backend named in `config`.
    pub async fn from_config(
        config: EngineConfig,
        generator: Arc<dyn GenerationService>,
        sink: Arc<dyn DeliverySink>,
    ) -> MindcordResult<Self> {
        let backend = open_state_store(&config.storage)?;
        Self::new(config, backend, generator, sink).await
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn reminders(&self) -> &Arc<ReminderQueue> {
        &self.reminders
    }

    pub fn generator(&self) -> &Arc<dyn GenerationService> {
        &self.generator
    }

    pub fn sink(&self) -> &Arc<dyn DeliverySink> {
        &self.sink
    }

    pub fn stats(&self) -> &Arc<EngineStats> {
        &self.stats
    }

    pub fn loop_stats(&self) -> &LoopStatsSet {
        &self.loop_stats
    }

    // ---- reactive path ----

    /// Handle one inbound event end to end. Never returns an error.
    pub async fn handle_event(&self, event: &InboundEvent) -> EventOutcome {
        if self.config.agent_user_id.as_deref() == Some(event.author_id.as_str()) {
            return EventOutcome::Ignored;
        }
        self.stats.record_event();

        let user = match self.tracker.observe_event(event).await {
            Ok(observation) => observation.user,
            Err(e) => {
                self.stats.record_storage_failure();
                warn!(user_id = %event.author_id, error = %e, "Could not record event, continuing with transient profile");
                self.transient_profile(event)
            }
        };

        if let Some(invocation) = Command::parse(&self.config.command_prefix, &event.text) {
            return self.handle_command(event, invocation).await;
        }

        let personality = match self.store.personality().await {
            Ok(p) => p,
            Err(e) => {
                self.stats.record_storage_failure();
                warn!(error = %e, "Could not load personality, using defaults");
                PersonalityState::default()
            }
        };

        let decision = self
            .decider
            .decide_with_mode(
                event,
                &user,
                &personality,
                self.generator.as_ref(),
                self.config.response.generation_timeout(),
            )
            .await;
        debug!(
            user_id = %event.author_id,
            channel_id = %event.channel_id,
            respond = decision.respond,
            basis = ?decision.basis,
            "Engagement decision"
        );
        if !decision.respond {
            return EventOutcome::Skipped(decision);
        }

        let reply = self.pipeline.respond(event, &user, &personality).await;
        EventOutcome::Replied { decision, reply }
    }

    /// Profile used when the stored one cannot be read or written.
    fn transient_profile(&self, event: &InboundEvent) -> UserProfile {
        let mut profile = UserProfile::new(&event.author_display_name, Utc::now());
        profile.total_interactions = 1;
        if let Some(venue_id) = &event.venue_id {
            profile.share_venue(venue_id);
        }
        if self
            .config
            .creator
            .matches(&event.author_id, &event.author_display_name)
        {
            profile.mark_creator();
        }
        profile
    }

    async fn handle_command(&self, event: &InboundEvent, invocation: Invocation) -> EventOutcome {
        let kind = invocation.kind;
        let reply = match invocation.command {
            Ok(command) => self
                .execute_command(event, command)
                .await
                .unwrap_or_else(|e| {
                    warn!(user_id = %event.author_id, command = %kind, error = %e, "Command failed");
                    commands::error_reply(&e)
                }),
            Err(e) => commands::error_reply(&e),
        };

        let delivered = match self.sink.send(&event.channel_id, &reply).await {
            Ok(()) => true,
            Err(e) => {
                warn!(channel_id = %event.channel_id, command = %kind, error = %e, "Command reply not delivered");
                false
            }
        };
        EventOutcome::Command { kind, delivered }
    }

    async fn execute_command(&self, event: &InboundEvent, command: Command) -> MindcordResult<String> {
        match command {
            Command::Mood => Ok(commands::mood_reply(&self.mood_report().await?)),
            Command::Remember { text } => {
                self.remember(&event.author_id, &text).await?;
                Ok(commands::remember_reply().to_string())
            }
            Command::Forget { text } => {
                let removed = self.forget(&event.author_id, &text).await?;
                Ok(commands::forget_reply(removed))
            }
            Command::MyData => {
                let profile = self.user_profile(&event.author_id).await?;
                let reminders = self.reminders.pending_for(&event.author_id).await;
                Ok(commands::user_summary(profile.as_ref(), &reminders))
            }
            Command::ServerData => {
                let venue = match &event.venue_id {
                    Some(venue_id) => Some(
                        self.venue_profile(venue_id)
                            .await?
                            .ok_or_else(|| MindcordError::venue_not_found(venue_id))?,
                    ),
                    None => None,
                };
                Ok(commands::venue_summary(venue.as_ref()))
            }
            Command::Status => Ok(commands::status_reply(&self.status().await?)),
            Command::Remind { minutes, text } => {
                let reminder = self
                    .schedule_reminder(&event.author_id, &event.channel_id, minutes, &text)
                    .await?;
                Ok(commands::reminder_reply(&reminder, minutes))
            }
        }
    }

    // ---- operations ----

    /// Current mood and energy.
    pub async fn mood_report(&self) -> MindcordResult<MoodReport> {
        Ok(MoodReport::from(&self.store.personality().await?))
    }

    /// Store a memory about a known user.
    pub async fn remember(&self, user_id: &str, text: &str) -> MindcordResult<MemoryNote> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MindcordError::validation("memory text must not be empty"));
        }
        let now = Utc::now();
        let note = self
            .store
            .update_existing_user(user_id, |profile| {
                profile.remember(text, now);
                MemoryNote {
                    text: text.to_string(),
                    timestamp: now,
                }
            })
            .await?
            .ok_or_else(|| MindcordError::user_not_found(user_id))?;
        debug!(user_id = %user_id, "Memory stored");
        Ok(note)
    }

    /// Remove every memory of a user containing `needle`, case-insensitively.
    pub async fn forget(&self, user_id: &str, needle: &str) -> MindcordResult<usize> {
        if needle.trim().is_empty() {
            return Err(MindcordError::validation("forget text must not be empty"));
        }
        let removed = self
            .store
            .update_existing_user(user_id, |profile| profile.forget(needle))
            .await?
            .ok_or_else(|| MindcordError::user_not_found(user_id))?;
        debug!(user_id = %user_id, removed, "Memories forgotten");
        Ok(removed)
    }

    pub async fn user_profile(&self, user_id: &str) -> MindcordResult<Option<UserProfile>> {
        self.store.user(user_id).await
    }

    pub async fn venue_profile(&self, venue_id: &str) -> MindcordResult<Option<VenueProfile>> {
        self.store.venue(venue_id).await
    }

    /// Aggregate status: counts, latency, current thought and loop health.
    pub async fn status(&self) -> MindcordResult<StatusReport> {
        let personality = self.store.personality().await?;
        Ok(StatusReport {
            agent_name: self.config.agent_name.clone(),
            model: self.generator.model_name().to_string(),
            storage_backend: self.store.backend().backend_name().to_string(),
            uptime_secs: self.started.elapsed().as_secs(),
            mood: personality.main_mood.clone(),
            energy_level: personality.energy_level,
            current_thought: personality.current_thought().map(str::to_string),
            users: self.store.user_ids().await?.len(),
            venues: self.store.venue_ids().await?.len(),
            pending_reminders: self.reminders.pending().await,
            engine: self.stats.snapshot(),
            loops: self.loop_stats.snapshot(),
        })
    }

    /// Queue a reminder `minutes` from now in `channel_id`.
    pub async fn schedule_reminder(
        &self,
        user_id: &str,
        channel_id: &str,
        minutes: i64,
        text: &str,
    ) -> MindcordResult<Reminder> {
        self.reminders
            .schedule(user_id, channel_id, text, minutes, Utc::now())
            .await
    }

    // ---- dispatch ----

    /// Consume inbound events until the sender side closes.
    ///
    /// Each channel gets its own worker so events in one channel are handled
    /// in arrival order while different channels proceed concurrently. The
    /// dispatcher never waits on a worker: an event for a channel whose queue
    /// is full is dropped and counted. Workers exit after
    /// `dispatch.worker_idle_secs` without events and are respawned on demand.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<InboundEvent>) {
        let mut workers: HashMap<String, mpsc::Sender<InboundEvent>> = HashMap::new();
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    log_worker_exit(result);
                }
                event = events.recv() => match event {
                    Some(event) => self.dispatch(&mut workers, &mut tasks, event),
                    None => break,
                },
            }
        }

        drop(workers);
        while let Some(result) = tasks.join_next().await {
            log_worker_exit(result);
        }
        info!("Event stream closed");
    }

    fn dispatch(
        self: &Arc<Self>,
        workers: &mut HashMap<String, mpsc::Sender<InboundEvent>>,
        tasks: &mut JoinSet<()>,
        event: InboundEvent,
    ) {
        workers.retain(|_, tx| !tx.is_closed());
        let channel_id = event.channel_id.clone();
        let tx = workers
            .entry(channel_id.clone())
            .or_insert_with(|| self.spawn_worker(&channel_id, tasks));

        let event = match tx.try_send(event) {
            Ok(()) => return,
            Err(TrySendError::Full(_)) => {
                warn!(channel_id = %channel_id, "Channel queue full, dropping event");
                self.stats.record_dropped_event();
                return;
            }
            // The worker went idle after the retain above.
            Err(TrySendError::Closed(event)) => event,
        };

        let tx = self.spawn_worker(&channel_id, tasks);
        if tx.try_send(event).is_err() {
            warn!(channel_id = %channel_id, "Fresh channel worker refused event");
            self.stats.record_dropped_event();
        }
        workers.insert(channel_id, tx);
    }

    fn spawn_worker(
        self: &Arc<Self>,
        channel_id: &str,
        tasks: &mut JoinSet<()>,
    ) -> mpsc::Sender<InboundEvent> {
        let (tx, rx) = mpsc::channel(self.config.dispatch.channel_queue_depth);
        tasks.spawn(self.clone().channel_worker(channel_id.to_string(), rx));
        tx
    }

    async fn channel_worker(self: Arc<Self>, channel_id: String, mut rx: mpsc::Receiver<InboundEvent>) {
        let idle = self.config.dispatch.worker_idle();
        let _gauge = WorkerGauge::enter(self.stats.clone());
        debug!(channel_id = %channel_id, "Channel worker started");

        loop {
            match tokio::time::timeout(idle, rx.recv()).await {
                Ok(Some(event)) => self.handle_queued(&channel_id, &event).await,
                Ok(None) => break,
                Err(_) => {
                    // Refuse new events, then finish whatever slipped in.
                    rx.close();
                    while let Some(event) = rx.recv().await {
                        self.handle_queued(&channel_id, &event).await;
                    }
                    debug!(channel_id = %channel_id, "Channel worker idle, exiting");
                    break;
                }
            }
        }
    }

    async fn handle_queued(&self, channel_id: &str, event: &InboundEvent) {
        let outcome = self.handle_event(event).await;
        debug!(channel_id = %channel_id, ?outcome, "Event handled");
    }
}

/// Keeps the live worker count right even when a worker panics or is aborted.
struct WorkerGauge(Arc<EngineStats>);

impl WorkerGauge {
    fn enter(stats: Arc<EngineStats>) -> Self {
        stats.worker_started();
        Self(stats)
    }
}

impl Drop for WorkerGauge {
    fn drop(&mut self) {
        self.0.worker_stopped();
    }
}

fn log_worker_exit(result: Result<(), JoinError>) {
    if let Err(e) = result {
        warn!(error = %e, "Channel worker panicked");
    }
}
