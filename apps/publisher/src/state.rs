//! Application state - the runner and the adapters it was built from.

use std::sync::Arc;

use pressroom_core::ports::{Clock, PostRepository, RunLock, SystemClock};
use pressroom_core::runner::ScheduledPublicationRunner;
use pressroom_infra::{InMemoryPostRepository, InMemoryRunLock};

use crate::config::AppConfig;

#[cfg(feature = "postgres")]
use pressroom_infra::database::{self, PostgresPostRepository};

#[cfg(feature = "redis")]
use pressroom_infra::RedisRunLock;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<ScheduledPublicationRunner>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let posts = Self::post_repository(config).await;
        let lock = Self::run_lock(config).await;

        tracing::info!("Application state initialized");

        Self {
            runner: Arc::new(ScheduledPublicationRunner::new(posts).with_lock(lock)),
            clock: Arc::new(SystemClock),
        }
    }

    #[cfg(feature = "postgres")]
    async fn post_repository(config: &AppConfig) -> Arc<dyn PostRepository> {
        let Some(db_config) = &config.database else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Arc::new(InMemoryPostRepository::new());
        };

        match database::connect(db_config).await {
            Ok(conn) => Arc::new(PostgresPostRepository::new(conn)),
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                Arc::new(InMemoryPostRepository::new())
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn post_repository(_config: &AppConfig) -> Arc<dyn PostRepository> {
        tracing::info!("Running without postgres feature - using in-memory repository");
        Arc::new(InMemoryPostRepository::new())
    }

    #[cfg(feature = "redis")]
    async fn run_lock(config: &AppConfig) -> Arc<dyn RunLock> {
        if !config.redis_lock {
            return Arc::new(InMemoryRunLock::new());
        }

        match RedisRunLock::from_env().await {
            Ok(lock) => Arc::new(lock),
            Err(e) => {
                tracing::error!(
                    "Failed to connect to Redis: {}. Using in-process run lock.",
                    e
                );
                Arc::new(InMemoryRunLock::new())
            }
        }
    }

    #[cfg(not(feature = "redis"))]
    async fn run_lock(config: &AppConfig) -> Arc<dyn RunLock> {
        if config.redis_lock {
            tracing::warn!("REDIS_URL set but redis feature disabled - using in-process run lock");
        }
        Arc::new(InMemoryRunLock::new())
    }
}
