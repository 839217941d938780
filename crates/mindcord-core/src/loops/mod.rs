//! Periodic background loops.
//!
//! Each loop implements [`BackgroundTask`]; [`LoopScheduler`] runs them on
//! fixed intervals with tokio-cron-scheduler. A failed iteration is logged
//! and counted in the loop's [`LoopStats`]; the next iteration runs as
//! scheduled.

mod consolidation;
mod mood;
mod outreach;
mod reminders;

pub use consolidation::{ConsolidationLoop, ConsolidationReport};
pub use mood::{energy_for_hour, MoodLoop, MoodTick};
pub use outreach::{template_opener, OutreachLoop, OutreachOutcome};
pub use reminders::{ReminderLoop, ReminderQueue, ReminderTick};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info};

use crate::config::LoopSchedule;
use crate::error::{MindcordError, MindcordResult};
use crate::stats::{LoopStats, LoopStatsSnapshot};

/// One unit of periodic work.
#[async_trait]
pub trait BackgroundTask: Send + Sync {
    /// Loop name for logs and status.
    fn name(&self) -> &'static str;

    /// Run one iteration.
    async fn run_once(&self) -> MindcordResult<()>;
}

/// Run one iteration and record its outcome. Never fails.
pub async fn run_iteration(task: &dyn BackgroundTask, stats: &LoopStats) {
    debug!(task = task.name(), "Loop iteration starting");
    match task.run_once().await {
        Ok(()) => stats.record_success(),
        Err(e) => {
            error!(task = task.name(), error = %e, "Loop iteration failed");
            stats.record_failure(&e);
        }
    }
}

/// Counters for the four engine loops.
#[derive(Debug, Default)]
pub struct LoopStatsSet {
    pub mood: Arc<LoopStats>,
    pub outreach: Arc<LoopStats>,
    pub reminders: Arc<LoopStats>,
    pub consolidation: Arc<LoopStats>,
}

impl LoopStatsSet {
    pub fn snapshot(&self) -> BTreeMap<String, LoopStatsSnapshot> {
        [
            ("mood", &self.mood),
            ("outreach", &self.outreach),
            ("reminders", &self.reminders),
            ("consolidation", &self.consolidation),
        ]
        .into_iter()
        .map(|(name, stats)| (name.to_string(), stats.snapshot()))
        .collect()
    }
}

struct Registered {
    task: Arc<dyn BackgroundTask>,
    stats: Arc<LoopStats>,
    schedule: LoopSchedule,
}

/// Runs background tasks on fixed intervals.
pub struct LoopScheduler {
    scheduler: JobScheduler,
    tasks: Vec<Registered>,
    running: bool,
}

impl LoopScheduler {
    /// Create a scheduler. Call `add` for each task, then `start`.
    pub async fn new() -> MindcordResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| MindcordError::internal(format!("Failed to create scheduler: {}", e)))?;
        Ok(Self {
            scheduler,
            tasks: Vec::new(),
            running: false,
        })
    }

    /// Register a task. Disabled schedules are ignored.
    pub fn add(&mut self, task: Arc<dyn BackgroundTask>, schedule: LoopSchedule, stats: Arc<LoopStats>) {
        if !schedule.enabled {
            debug!(task = task.name(), "Loop disabled");
            return;
        }
        self.tasks.push(Registered {
            task,
            stats,
            schedule,
        });
    }

    /// Names of the registered tasks.
    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|r| r.task.name()).collect()
    }

    /// Start every registered task, optionally running each once first.
    pub async fn start(&mut self, run_on_start: bool) -> MindcordResult<()> {
        if self.running {
            return Ok(());
        }

        for registered in &self.tasks {
            let task = registered.task.clone();
            let stats = registered.stats.clone();
            // Skip a tick instead of overlapping a slow iteration.
            let busy = Arc::new(Mutex::new(()));
            let interval = registered.schedule.interval();

            let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
                let task = task.clone();
                let stats = stats.clone();
                let busy = busy.clone();
                Box::pin(async move {
                    let Ok(_guard) = busy.try_lock() else {
                        debug!(task = task.name(), "Previous iteration still running, skipping");
                        return;
                    };
                    run_iteration(task.as_ref(), &stats).await;
                })
            })
            .map_err(|e| MindcordError::internal(format!("Failed to create job: {}", e)))?;

            self.scheduler
                .add(job)
                .await
                .map_err(|e| MindcordError::internal(format!("Failed to add job: {}", e)))?;

            if run_on_start {
                debug!(task = registered.task.name(), "Running initial iteration on start");
                run_iteration(registered.task.as_ref(), &registered.stats).await;
            }

            info!(
                task = registered.task.name(),
                interval_secs = interval.as_secs(),
                "Loop scheduled"
            );
        }

        self.scheduler
            .start()
            .await
            .map_err(|e| MindcordError::internal(format!("Failed to start scheduler: {}", e)))?;
        self.running = true;
        Ok(())
    }

    /// Stop the scheduler gracefully.
    pub async fn shutdown(&mut self) -> MindcordResult<()> {
        if !self.running {
            return Ok(());
        }
        info!("Shutting down loop scheduler");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| MindcordError::internal(format!("Failed to shutdown scheduler: {}", e)))?;
        self.running = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        calls: AtomicU32,
    }

    #[async_trait]
    impl BackgroundTask for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn run_once(&self) -> MindcordResult<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 0 {
                Err(MindcordError::storage_write("disk full"))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_iterations() {
        let task = Flaky {
            calls: AtomicU32::new(0),
        };
        let stats = LoopStats::new();
        for _ in 0..4 {
            run_iteration(&task, &stats).await;
        }
        let snap = stats.snapshot();
        assert_eq!(snap.runs, 4);
        assert_eq!(snap.failures, 2);
        assert!(snap.last_error.unwrap().contains("disk full"));
    }

    #[tokio::test]
    async fn test_disabled_schedule_is_not_registered() {
        let mut scheduler = LoopScheduler::new().await.unwrap();
        let task: Arc<dyn BackgroundTask> = Arc::new(Flaky {
            calls: AtomicU32::new(0),
        });
        scheduler.add(
            task.clone(),
            LoopSchedule {
                enabled: false,
                interval_secs: 60,
            },
            Arc::new(LoopStats::new()),
        );
        scheduler.add(task, LoopSchedule::every_secs(60), Arc::new(LoopStats::new()));
        assert_eq!(scheduler.task_names(), vec!["flaky"]);
    }

    #[tokio::test]
    async fn test_start_with_run_on_start_and_shutdown() {
        let mut scheduler = LoopScheduler::new().await.unwrap();
        let stats = Arc::new(LoopStats::new());
        scheduler.add(
            Arc::new(Flaky {
                calls: AtomicU32::new(1),
            }),
            LoopSchedule::every_secs(3600),
            stats.clone(),
        );

        scheduler.start(true).await.unwrap();
        assert_eq!(stats.snapshot().runs, 1);
        assert_eq!(stats.snapshot().failures, 0);
        scheduler.shutdown().await.unwrap();
    }
}
