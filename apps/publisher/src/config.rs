//! Application configuration loaded from environment variables.

use pressroom_infra::database::DatabaseConfig;

use crate::background::SchedulerConfig;
use crate::telemetry::TelemetryConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` runs against the in-memory store.
    pub database: Option<DatabaseConfig>,
    /// Use the Redis run lock when `REDIS_URL` is set.
    pub redis_lock: bool,
    pub scheduler: SchedulerConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            database: DatabaseConfig::from_env(),
            redis_lock: std::env::var("REDIS_URL").is_ok(),
            scheduler: SchedulerConfig::from_env(),
            telemetry: TelemetryConfig::from_env(),
        }
    }
}
