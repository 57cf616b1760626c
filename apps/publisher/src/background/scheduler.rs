//! Cron-style job scheduler using tokio-cron-scheduler.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Enable the recurring trigger.
    pub enabled: bool,
    /// Cron expression with a seconds field.
    pub schedule: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: "0 * * * * *".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            schedule: std::env::var("PUBLISHER_SCHEDULE")
                .unwrap_or_else(|_| "0 * * * * *".to_string()),
        }
    }
}

/// Lets jobs run until it is closed.
///
/// A running job holds a read guard on `in_flight` and checks `closed` only
/// once it has the guard. `close` sets the flag and then takes the write
/// guard, so it returns after running jobs finish and no job starts later.
#[derive(Clone, Default)]
struct JobGate {
    in_flight: Arc<RwLock<()>>,
    closed: Arc<AtomicBool>,
}

impl JobGate {
    /// Run `task` unless the gate is closed. Returns whether it ran.
    async fn run<Fut: Future<Output = ()>>(&self, task: Fut) -> bool {
        let _running = self.in_flight.read().await;
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        task.await;
        true
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let _drained = self.in_flight.write().await;
    }
}

/// Cron job scheduler wrapper.
pub struct Scheduler {
    inner: JobScheduler,
    gate: JobGate,
}

impl Scheduler {
    /// Create a new scheduler.
    pub async fn new() -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self {
            inner,
            gate: JobGate::default(),
        })
    }

    /// Add a cron job.
    ///
    /// # Example
    /// ```ignore
    /// scheduler.add_cron("0 * * * * *", || async {
    ///     tracing::info!("Running every minute");
    /// }).await?;
    /// ```
    pub async fn add_cron<F, Fut>(
        &self,
        schedule: &str,
        task: F,
    ) -> Result<uuid::Uuid, JobSchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let gate = self.gate.clone();
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let task = task.clone();
            let gate = gate.clone();
            Box::pin(async move {
                if !gate.run(task()).await {
                    tracing::debug!("Scheduler stopping, job not started");
                }
            })
        })?;

        let id = self.inner.add(job).await?;
        tracing::info!(schedule = %schedule, job_id = %id, "Cron job registered");
        Ok(id)
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        self.inner.start().await?;
        tracing::info!("Scheduler started");
        Ok(())
    }

    /// Stop firing new jobs and wait for running ones.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.gate.close().await;
        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn test_close_waits_for_running_job() {
        let gate = JobGate::default();
        let (started_tx, started_rx) = oneshot::channel();
        let (finish_tx, finish_rx) = oneshot::channel::<()>();

        let running = tokio::spawn({
            let gate = gate.clone();
            async move {
                gate.run(async move {
                    let _ = started_tx.send(());
                    let _ = finish_rx.await;
                })
                .await
            }
        });
        started_rx.await.unwrap();

        let closing = tokio::spawn({
            let gate = gate.clone();
            async move { gate.close().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!closing.is_finished());

        finish_tx.send(()).unwrap();
        assert!(running.await.unwrap());
        closing.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_gate_runs_nothing() {
        let gate = JobGate::default();
        assert!(gate.run(async {}).await);

        gate.close().await;
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        assert!(
            !gate
                .run(async move { flag.store(true, Ordering::SeqCst) })
                .await
        );
        assert!(!ran.load(Ordering::SeqCst));
    }
}
