//! The scheduled publication job.

use pressroom_core::RunnerError;
use pressroom_core::ports::Clock;
use pressroom_core::runner::ScheduledPublicationRunner;

/// Run one publication tick, logging instead of propagating failures.
pub async fn publish_tick(runner: &ScheduledPublicationRunner, clock: &dyn Clock) {
    match runner.tick(clock).await {
        Ok(report) if report.failed() > 0 => {
            tracing::warn!(
                failed = report.failed(),
                "Some scheduled posts failed to publish; they will be retried next tick"
            );
        }
        Ok(_) => {}
        // Already logged by the runner
        Err(RunnerError::AlreadyRunning) => {}
        Err(e) => tracing::error!(error = %e, "Publication tick aborted"),
    }
}
