//! mindcord-core - Personality and engagement engine for a chat agent.
//!
//! This crate holds the agent's state (a global personality, per-user and
//! per-venue profiles), the policy that decides when to speak, and the
//! periodic loops that evolve that state over time. The chat platform and the
//! text generation service are reached only through the [`DeliverySink`] and
//! [`GenerationService`] traits.
//!
//! # Example
//!
//! ```ignore
//! use mindcord_core::{BackgroundRuntime, Engine, EngineConfig};
//!
//! let config = EngineConfig::from_env();
//! let engine = Arc::new(Engine::from_config(config, generator, sink).await?);
//!
//! let mut runtime = BackgroundRuntime::new(&engine).await?;
//! runtime.start().await?;
//!
//! let (tx, rx) = tokio::sync::mpsc::channel(256);
//! tokio::spawn(engine.clone().run(rx));
//! tx.send(InboundEvent::private("42", "sam", "dm-42", "hey")).await?;
//! ```

pub mod commands;
pub mod config;
pub mod engagement;
pub mod engine;
pub mod error;
pub mod loops;
pub mod pipeline;
pub mod prompts;
pub mod runtime;
pub mod stats;
pub mod store;
pub mod tracker;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use commands::{Command, CommandKind};
pub use config::{DecisionMode, DispatchConfig, EngineConfig, MoodSource, StorageBackend};
pub use engagement::{Decision, DecisionBasis, EngagementDecider, ScoreBreakdown};
pub use engine::{Engine, EventOutcome, MoodReport, StatusReport};
pub use error::{ErrorCode, MindcordError, MindcordResult};
pub use pipeline::{ReplyOutcome, ResponsePipeline};
pub use runtime::BackgroundRuntime;
pub use stats::{EngineStatsSnapshot, LoopStatsSnapshot};
pub use store::{EntityStore, StateStore};
pub use traits::{ChannelInfo, DeliverySink, GenerationService};
pub use types::{
    EnergyLevel, InboundEvent, PersonalityState, RelationshipLevel, Reminder, UserProfile,
    VenueProfile,
};
