//! Configuration system for mindcord.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{MindcordError, MindcordResult};
use crate::types::{EnergyLevel, RelationshipLevel};

/// Persistence backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    Json,
    Sqlite,
}

/// Where entity records live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Data directory (json) or database file / directory (sqlite).
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .map(|h| h.join(".mindcord"))
            .unwrap_or_else(|| PathBuf::from(".mindcord"));

        Self {
            backend: StorageBackend::Json,
            path: data_dir.join("data"),
        }
    }
}

/// The identity that receives the permanent creator tier.
///
/// Matching either field is enough.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatorIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl CreatorIdentity {
    pub fn matches(&self, user_id: &str, display_name: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
            || self.display_name.as_deref() == Some(display_name)
    }
}

/// How the reactive decision is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecisionMode {
    #[default]
    Heuristic,
    /// Ask the generation service; fall back to the heuristic on failure.
    Delegated,
}

/// Energy level bonuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyBonuses {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub very_high: f64,
}

impl Default for EnergyBonuses {
    fn default() -> Self {
        Self {
            low: 0.0,
            medium: 0.02,
            high: 0.04,
            very_high: 0.05,
        }
    }
}

/// Relationship tier bonuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipBonuses {
    pub new: f64,
    pub acquaintance: f64,
    pub friend: f64,
    pub close_friend: f64,
    pub creator: f64,
}

impl Default for RelationshipBonuses {
    fn default() -> Self {
        Self {
            new: 0.0,
            acquaintance: 0.05,
            friend: 0.10,
            close_friend: 0.15,
            creator: 0.35,
        }
    }
}

/// Every constant the engagement policy uses, in one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringTable {
    pub base_rate: f64,
    /// Mood name (lowercase) to additive bonus. Unlisted moods add nothing.
    pub mood_bonuses: HashMap<String, f64>,
    pub energy_bonuses: EnergyBonuses,
    pub relationship_bonuses: RelationshipBonuses,
    pub interesting_topics: Vec<String>,
    /// Added once when any interesting topic occurs in the text.
    pub keyword_bonus: f64,
}

impl Default for ScoringTable {
    fn default() -> Self {
        let mut mood_bonuses = HashMap::new();
        for mood in ["chatty", "social", "hyped", "excited", "friendly"] {
            mood_bonuses.insert(mood.to_string(), 0.10);
        }
        for mood in ["curious", "creative"] {
            mood_bonuses.insert(mood.to_string(), 0.06);
        }

        Self {
            base_rate: 0.05,
            mood_bonuses,
            energy_bonuses: EnergyBonuses::default(),
            relationship_bonuses: RelationshipBonuses::default(),
            interesting_topics: [
                "gaming", "game", "tech", "meme", "music", "anime", "code", "rust",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            keyword_bonus: 0.20,
        }
    }
}

impl ScoringTable {
    pub fn mood_bonus(&self, mood: &str) -> f64 {
        self.mood_bonuses
            .get(&mood.trim().to_lowercase())
            .copied()
            .unwrap_or(0.0)
    }

    pub fn energy_bonus(&self, energy: EnergyLevel) -> f64 {
        match energy {
            EnergyLevel::Low => self.energy_bonuses.low,
            EnergyLevel::Medium => self.energy_bonuses.medium,
            EnergyLevel::High => self.energy_bonuses.high,
            EnergyLevel::VeryHigh => self.energy_bonuses.very_high,
        }
    }

    pub fn relationship_bonus(&self, level: RelationshipLevel) -> f64 {
        match level {
            RelationshipLevel::New => self.relationship_bonuses.new,
            RelationshipLevel::Acquaintance => self.relationship_bonuses.acquaintance,
            RelationshipLevel::Friend => self.relationship_bonuses.friend,
            RelationshipLevel::CloseFriend => self.relationship_bonuses.close_friend,
            RelationshipLevel::Creator => self.relationship_bonuses.creator,
        }
    }

    /// Whether the text mentions any interesting topic (case-insensitive).
    pub fn mentions_interesting_topic(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.interesting_topics
            .iter()
            .filter(|t| !t.trim().is_empty())
            .any(|t| text.contains(&t.to_lowercase()))
    }
}

/// Engagement decider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    pub mode: DecisionMode,
    pub scoring: ScoringTable,
}

/// Response pipeline timing and sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub thinking_delay_min_secs: f64,
    pub thinking_delay_max_secs: f64,
    /// Maximum characters per delivered message.
    pub chunk_limit: usize,
    pub chunk_pacing_secs: f64,
    /// Deadline for one generation call.
    pub generation_timeout_secs: f64,
    pub typing_indicator: bool,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            thinking_delay_min_secs: 1.0,
            thinking_delay_max_secs: 4.0,
            chunk_limit: 2000,
            chunk_pacing_secs: 0.75,
            generation_timeout_secs: 30.0,
            typing_indicator: true,
        }
    }
}

impl ResponseConfig {
    pub fn generation_timeout(&self) -> Duration {
        secs(self.generation_timeout_secs)
    }

    pub fn chunk_pacing(&self) -> Duration {
        secs(self.chunk_pacing_secs)
    }

    /// Normalized `(min, max)` thinking delay bounds in seconds.
    pub fn thinking_delay_bounds(&self) -> (f64, f64) {
        let min = self.thinking_delay_min_secs.max(0.0);
        let max = self.thinking_delay_max_secs.max(min);
        (min, max)
    }
}

/// Period and enable flag for one background loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopSchedule {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub interval_secs: u64,
}

impl LoopSchedule {
    pub fn every_secs(interval_secs: u64) -> Self {
        Self {
            enabled: true,
            interval_secs,
        }
    }

    pub fn every_minutes(minutes: u64) -> Self {
        Self::every_secs(minutes * 60)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

fn default_true() -> bool {
    true
}

/// Background loop schedules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopsConfig {
    pub mood: LoopSchedule,
    pub outreach: LoopSchedule,
    pub reminders: LoopSchedule,
    pub consolidation: LoopSchedule,
    /// Run every enabled loop once immediately on start.
    pub run_on_start: bool,
}

impl Default for LoopsConfig {
    fn default() -> Self {
        Self {
            mood: LoopSchedule::every_minutes(60),
            outreach: LoopSchedule::every_minutes(30),
            reminders: LoopSchedule::every_secs(60),
            consolidation: LoopSchedule::every_minutes(360),
            run_on_start: false,
        }
    }
}

/// Where mood changes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MoodSource {
    /// Ask the generation service.
    #[default]
    Generated,
    /// Pick from the vocabulary at random.
    Random,
}

/// Mood evolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodConfig {
    pub source: MoodSource,
    pub random_change_probability: f64,
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            source: MoodSource::Generated,
            random_change_probability: 0.3,
        }
    }
}

/// Resolution of a venue's designated default public channel.
///
/// The explicit map wins; otherwise a channel with `fallback_channel_name`
/// is looked up through the delivery sink. No match means skip the venue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultChannelPolicy {
    pub channels: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_channel_name: Option<String>,
}

impl DefaultChannelPolicy {
    pub fn with_channel(mut self, venue_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        self.channels.insert(venue_id.into(), channel_id.into());
        self
    }

    pub fn with_fallback_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_channel_name = Some(name.into());
        self
    }
}

/// Proactive outreach settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutreachConfig {
    /// Chance per cycle of reaching out at all.
    pub probability: f64,
    pub outgoing_moods: Vec<String>,
    /// Users seen more recently than this are not contacted.
    pub min_idle_minutes: i64,
    pub default_channels: DefaultChannelPolicy,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            probability: 0.10,
            outgoing_moods: ["social", "chatty", "hyped", "bored", "excited"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_idle_minutes: 60,
            default_channels: DefaultChannelPolicy::default(),
        }
    }
}

impl OutreachConfig {
    pub fn is_outgoing(&self, mood: &str) -> bool {
        self.outgoing_moods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mood.trim()))
    }
}

/// Bounds for the history lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub mood_history_cap: usize,
    pub mood_history_days: i64,
    pub thoughts_cap: usize,
    pub interaction_log_cap: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            mood_history_cap: 20,
            mood_history_days: 30,
            thoughts_cap: 10,
            interaction_log_cap: 50,
        }
    }
}

impl RetentionConfig {
    pub fn mood_history_max_age(&self) -> chrono::Duration {
        chrono::Duration::days(self.mood_history_days)
    }
}

/// Reminder limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub max_horizon_minutes: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            max_horizon_minutes: 1440,
        }
    }
}

/// Per-channel event dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Events buffered for one channel before new ones are dropped.
    pub channel_queue_depth: usize,
    /// A channel worker with nothing to do for this long exits.
    pub worker_idle_secs: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            channel_queue_depth: 64,
            worker_idle_secs: 300.0,
        }
    }
}

impl DispatchConfig {
    pub fn worker_idle(&self) -> Duration {
        secs(self.worker_idle_secs)
    }
}

/// Main engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub agent_name: String,
    /// The agent's own user id; events authored by it are ignored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_user_id: Option<String>,
    pub creator: CreatorIdentity,
    pub command_prefix: String,
    pub storage: StorageConfig,
    pub engagement: EngagementConfig,
    pub response: ResponseConfig,
    pub loops: LoopsConfig,
    pub mood: MoodConfig,
    pub outreach: OutreachConfig,
    pub retention: RetentionConfig,
    pub reminders: ReminderConfig,
    pub dispatch: DispatchConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            agent_name: "Mindcord".to_string(),
            agent_user_id: None,
            creator: CreatorIdentity::default(),
            command_prefix: "!".to_string(),
            storage: StorageConfig::default(),
            engagement: EngagementConfig::default(),
            response: ResponseConfig::default(),
            loops: LoopsConfig::default(),
            mood: MoodConfig::default(),
            outreach: OutreachConfig::default(),
            retention: RetentionConfig::default(),
            reminders: ReminderConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> MindcordResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| MindcordError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| MindcordError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| MindcordError::Configuration(e.to_string())),
            _ => Err(MindcordError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads:
    /// - `MINDCORD_AGENT_NAME`, `MINDCORD_AGENT_USER_ID`
    /// - `MINDCORD_CREATOR_ID`, `MINDCORD_CREATOR_NAME`
    /// - `MINDCORD_COMMAND_PREFIX`
    /// - `MINDCORD_STORAGE` (`memory`, `json`, `sqlite`), `MINDCORD_DATA_DIR`
    /// - `MINDCORD_DECISION_MODE` (`heuristic`, `delegated`)
    /// - `MINDCORD_MOOD_SOURCE` (`generated`, `random`)
    /// - `MINDCORD_GENERATION_TIMEOUT_SECS`
    /// - `MINDCORD_DEFAULT_CHANNEL_NAME`
    /// - `MINDCORD_RUN_LOOPS_ON_START`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("MINDCORD_AGENT_NAME") {
            config.agent_name = name;
        }
        if let Ok(id) = std::env::var("MINDCORD_AGENT_USER_ID") {
            config.agent_user_id = Some(id);
        }
        if let Ok(id) = std::env::var("MINDCORD_CREATOR_ID") {
            config.creator.user_id = Some(id);
        }
        if let Ok(name) = std::env::var("MINDCORD_CREATOR_NAME") {
            config.creator.display_name = Some(name);
        }
        if let Ok(prefix) = std::env::var("MINDCORD_COMMAND_PREFIX") {
            config.command_prefix = prefix;
        }

        if let Ok(backend) = std::env::var("MINDCORD_STORAGE") {
            config.storage.backend = match backend.to_lowercase().as_str() {
                "memory" => StorageBackend::Memory,
                "sqlite" => StorageBackend::Sqlite,
                _ => StorageBackend::Json,
            };
        }
        if let Ok(path) = std::env::var("MINDCORD_DATA_DIR") {
            config.storage.path = PathBuf::from(path);
        }

        if let Ok(mode) = std::env::var("MINDCORD_DECISION_MODE") {
            config.engagement.mode = match mode.to_lowercase().as_str() {
                "delegated" => DecisionMode::Delegated,
                _ => DecisionMode::Heuristic,
            };
        }
        if let Ok(source) = std::env::var("MINDCORD_MOOD_SOURCE") {
            config.mood.source = match source.to_lowercase().as_str() {
                "random" => MoodSource::Random,
                _ => MoodSource::Generated,
            };
        }
        if let Ok(timeout) = std::env::var("MINDCORD_GENERATION_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                config.response.generation_timeout_secs = secs;
            }
        }
        if let Ok(name) = std::env::var("MINDCORD_DEFAULT_CHANNEL_NAME") {
            config.outreach.default_channels.fallback_channel_name = Some(name);
        }
        if std::env::var("MINDCORD_RUN_LOOPS_ON_START").is_ok() {
            config.loops.run_on_start = true;
        }

        config
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Reject values that would make the engine misbehave.
    pub fn validate(&self) -> MindcordResult<()> {
        if self.agent_name.trim().is_empty() {
            return Err(MindcordError::Configuration("agent_name must not be empty".into()));
        }
        if self.response.chunk_limit == 0 {
            return Err(MindcordError::Configuration("response.chunk_limit must be positive".into()));
        }
        if self.response.generation_timeout_secs <= 0.0 {
            return Err(MindcordError::Configuration(
                "response.generation_timeout_secs must be positive".into(),
            ));
        }
        if self.dispatch.channel_queue_depth == 0 {
            return Err(MindcordError::Configuration(
                "dispatch.channel_queue_depth must be positive".into(),
            ));
        }
        if self.dispatch.worker_idle_secs <= 0.0 {
            return Err(MindcordError::Configuration(
                "dispatch.worker_idle_secs must be positive".into(),
            ));
        }
        for (name, p) in [
            ("outreach.probability", self.outreach.probability),
            ("mood.random_change_probability", self.mood.random_change_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(MindcordError::Configuration(format!(
                    "{} must be within [0, 1], got {}",
                    name, p
                )));
            }
        }
        Ok(())
    }
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}

/// Builder for EngineConfig.
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the agent's name.
    pub fn agent_name(mut self, name: impl Into<String>) -> Self {
        self.config.agent_name = name.into();
        self
    }

    /// Set the agent's own user id.
    pub fn agent_user_id(mut self, id: impl Into<String>) -> Self {
        self.config.agent_user_id = Some(id.into());
        self
    }

    /// Set the creator identity by user id.
    pub fn creator_id(mut self, id: impl Into<String>) -> Self {
        self.config.creator.user_id = Some(id.into());
        self
    }

    /// Set the creator identity by display name.
    pub fn creator_name(mut self, name: impl Into<String>) -> Self {
        self.config.creator.display_name = Some(name.into());
        self
    }

    /// Set the command prefix.
    pub fn command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.command_prefix = prefix.into();
        self
    }

    /// Set storage configuration.
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Keep all state in memory.
    pub fn in_memory(mut self) -> Self {
        self.config.storage.backend = StorageBackend::Memory;
        self
    }

    /// Set the decision mode.
    pub fn decision_mode(mut self, mode: DecisionMode) -> Self {
        self.config.engagement.mode = mode;
        self
    }

    /// Replace the scoring table.
    pub fn scoring(mut self, scoring: ScoringTable) -> Self {
        self.config.engagement.scoring = scoring;
        self
    }

    /// Set response configuration.
    pub fn response(mut self, response: ResponseConfig) -> Self {
        self.config.response = response;
        self
    }

    /// Remove the emulated thinking delay and chunk pacing.
    pub fn without_delays(mut self) -> Self {
        self.config.response.thinking_delay_min_secs = 0.0;
        self.config.response.thinking_delay_max_secs = 0.0;
        self.config.response.chunk_pacing_secs = 0.0;
        self
    }

    /// Set loop schedules.
    pub fn loops(mut self, loops: LoopsConfig) -> Self {
        self.config.loops = loops;
        self
    }

    /// Set mood configuration.
    pub fn mood(mut self, mood: MoodConfig) -> Self {
        self.config.mood = mood;
        self
    }

    /// Set outreach configuration.
    pub fn outreach(mut self, outreach: OutreachConfig) -> Self {
        self.config.outreach = outreach;
        self
    }

    /// Set retention bounds.
    pub fn retention(mut self, retention: RetentionConfig) -> Self {
        self.config.retention = retention;
        self
    }

    /// Set per-channel dispatch limits.
    pub fn dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.config.dispatch = dispatch;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.agent_name, "Mindcord");
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.loops.mood.interval_secs, 3600);
        assert_eq!(config.loops.outreach.interval_secs, 1800);
        assert_eq!(config.loops.consolidation.interval_secs, 6 * 3600);
        assert_eq!(config.retention.mood_history_cap, 20);
        assert_eq!(config.reminders.max_horizon_minutes, 1440);
        assert_eq!(config.dispatch.channel_queue_depth, 64);
        assert_eq!(config.dispatch.worker_idle(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dispatch_limits_are_validated() {
        let mut config = EngineConfig::default();
        config.dispatch.channel_queue_depth = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.dispatch.worker_idle_secs = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scoring_lookups() {
        let table = ScoringTable::default();
        assert_eq!(table.mood_bonus("Chatty"), 0.10);
        assert_eq!(table.mood_bonus("curious"), 0.06);
        assert_eq!(table.mood_bonus("grumpy"), 0.0);
        assert_eq!(table.energy_bonus(EnergyLevel::VeryHigh), 0.05);
        assert_eq!(table.relationship_bonus(RelationshipLevel::Friend), 0.10);
        assert!(table.mentions_interesting_topic("anyone into MUSIC?"));
        assert!(!table.mentions_interesting_topic("what's for lunch"));
    }

    #[test]
    fn test_creator_matches_either_field() {
        let creator = CreatorIdentity {
            user_id: Some("42".into()),
            display_name: Some("Maker".into()),
        };
        assert!(creator.matches("42", "someone"));
        assert!(creator.matches("7", "Maker"));
        assert!(!creator.matches("7", "someone"));
        assert!(!CreatorIdentity::default().matches("42", "Maker"));
    }

    #[test]
    fn test_from_toml_file_with_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mindcord.toml");
        std::fs::write(
            &path,
            r#"
agent_name = "Pixel"

[creator]
display_name = "Maker"

[storage]
backend = "sqlite"
path = "/tmp/pixel"

[engagement]
mode = "delegated"

[loops.reminders]
interval_secs = 5

[outreach.default_channels]
fallback_channel_name = "general"
"#,
        )
        .unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.agent_name, "Pixel");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.engagement.mode, DecisionMode::Delegated);
        assert_eq!(config.loops.reminders.interval_secs, 5);
        assert!(config.loops.reminders.enabled);
        assert_eq!(config.loops.mood.interval_secs, 3600);
        assert_eq!(
            config.outreach.default_channels.fallback_channel_name.as_deref(),
            Some("general")
        );
        assert_eq!(config.engagement.scoring.base_rate, 0.05);
    }

    #[test]
    fn test_from_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("c.yaml");
        std::fs::write(&yaml, "command_prefix: \"?\"\nmood:\n  source: random\n").unwrap();
        let config = EngineConfig::from_file(&yaml).unwrap();
        assert_eq!(config.command_prefix, "?");
        assert_eq!(config.mood.source, MoodSource::Random);

        let json = dir.path().join("c.json");
        std::fs::write(&json, r#"{"retention": {"interaction_log_cap": 80}}"#).unwrap();
        let config = EngineConfig::from_file(&json).unwrap();
        assert_eq!(config.retention.interaction_log_cap, 80);
        assert_eq!(config.retention.thoughts_cap, 10);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.ini");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            EngineConfig::from_file(&path),
            Err(MindcordError::Configuration(_))
        ));
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::builder()
            .agent_name("Pixel")
            .creator_id("1")
            .in_memory()
            .without_delays()
            .decision_mode(DecisionMode::Delegated)
            .build();

        assert_eq!(config.agent_name, "Pixel");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.response.thinking_delay_bounds(), (0.0, 0.0));
        assert_eq!(config.engagement.mode, DecisionMode::Delegated);
    }

    #[test]
    fn test_validate_rejects_bad_probability() {
        let mut config = EngineConfig::default();
        config.outreach.probability = 1.5;
        assert!(config.validate().is_err());
    }
}
