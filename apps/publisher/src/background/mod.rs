//! Background processing - the cron trigger and the job it runs.

mod publish;
mod scheduler;

pub use publish::publish_tick;
pub use scheduler::{Scheduler, SchedulerConfig};
