//! Background runtime for the engine's periodic loops.
//!
//! Wires the mood, outreach, reminder and consolidation loops to the engine's
//! shared state and runs them on one scheduler, with unified startup and
//! graceful shutdown.

use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::MindcordResult;
use crate::loops::{ConsolidationLoop, LoopScheduler, MoodLoop, OutreachLoop, ReminderLoop};

/// Background runtime managing the loop scheduler lifecycle.
///
/// # Example
///
/// ```ignore
/// use mindcord_core::{BackgroundRuntime, Engine};
///
/// let engine = Arc::new(Engine::from_config(config, generator, sink).await?);
/// let mut runtime = BackgroundRuntime::new(&engine).await?;
/// runtime.start().await?;
///
/// // ... feed events with engine.clone().run(rx) ...
///
/// runtime.shutdown().await?;
/// ```
pub struct BackgroundRuntime {
    scheduler: LoopScheduler,
    run_on_start: bool,
}

impl BackgroundRuntime {
    /// Build the loops for an engine. Nothing runs until `start()`.
    pub async fn new(engine: &Engine) -> MindcordResult<Self> {
        let config = engine.config();
        let stats = engine.loop_stats();
        let deadline = config.response.generation_timeout();
        let mut scheduler = LoopScheduler::new().await?;

        scheduler.add(
            Arc::new(MoodLoop::new(
                engine.store().clone(),
                engine.generator().clone(),
                config.mood.clone(),
                config.retention.clone(),
                config.agent_name.clone(),
                deadline,
            )),
            config.loops.mood.clone(),
            stats.mood.clone(),
        );
        scheduler.add(
            Arc::new(OutreachLoop::new(
                engine.store().clone(),
                engine.generator().clone(),
                engine.sink().clone(),
                config.outreach.clone(),
                config.agent_name.clone(),
                deadline,
            )),
            config.loops.outreach.clone(),
            stats.outreach.clone(),
        );
        scheduler.add(
            Arc::new(ReminderLoop::new(
                engine.reminders().clone(),
                engine.sink().clone(),
            )),
            config.loops.reminders.clone(),
            stats.reminders.clone(),
        );
        scheduler.add(
            Arc::new(ConsolidationLoop::new(
                engine.store().clone(),
                config.retention.clone(),
            )),
            config.loops.consolidation.clone(),
            stats.consolidation.clone(),
        );

        debug!(tasks = ?scheduler.task_names(), "Created BackgroundRuntime");
        Ok(Self {
            scheduler,
            run_on_start: config.loops.run_on_start,
        })
    }

    /// Names of the enabled loops.
    pub fn task_names(&self) -> Vec<&'static str> {
        self.scheduler.task_names()
    }

    /// Start every enabled loop.
    pub async fn start(&mut self) -> MindcordResult<()> {
        self.scheduler.start(self.run_on_start).await?;
        info!(tasks = ?self.scheduler.task_names(), "Background runtime started");
        Ok(())
    }

    /// Stop every loop. Safe to call more than once.
    pub async fn shutdown(&mut self) -> MindcordResult<()> {
        self.scheduler.shutdown().await?;
        info!("Background runtime stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, LoopSchedule, LoopsConfig};
    use crate::store::InMemoryStateStore;
    use crate::traits::{MockDeliverySink, MockGenerationService};

    async fn engine(loops: LoopsConfig) -> Engine {
        let mut generator = MockGenerationService::new();
        generator.expect_model_name().return_const("mock".to_string());
        let config = EngineConfig::builder().in_memory().loops(loops).build();
        Engine::new(
            config,
            Arc::new(InMemoryStateStore::new()),
            Arc::new(generator),
            Arc::new(MockDeliverySink::new()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_all_loops_registered_by_default() {
        let engine = engine(LoopsConfig::default()).await;
        let runtime = BackgroundRuntime::new(&engine).await.unwrap();
        assert_eq!(
            runtime.task_names(),
            vec!["mood", "outreach", "reminders", "consolidation"]
        );
    }

    #[tokio::test]
    async fn test_disabled_loops_are_skipped_and_lifecycle_works() {
        let loops = LoopsConfig {
            mood: LoopSchedule {
                enabled: false,
                ..LoopSchedule::every_minutes(60)
            },
            outreach: LoopSchedule {
                enabled: false,
                ..LoopSchedule::every_minutes(30)
            },
            run_on_start: true,
            ..LoopsConfig::default()
        };
        let engine = engine(loops).await;
        let mut runtime = BackgroundRuntime::new(&engine).await.unwrap();
        assert_eq!(runtime.task_names(), vec!["reminders", "consolidation"]);

        runtime.start().await.unwrap();
        let snapshot = engine.loop_stats().snapshot();
        assert_eq!(snapshot["reminders"].runs, 1);
        assert_eq!(snapshot["consolidation"].runs, 1);
        assert_eq!(snapshot["consolidation"].failures, 0);
        assert_eq!(snapshot["mood"].runs, 0);

        runtime.shutdown().await.unwrap();
        runtime.shutdown().await.unwrap();
    }
}
