//! Redis run lock - a leased `SET NX PX` key with a per-holder token.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};
use uuid::Uuid;

use pressroom_core::ports::{LockError, RunGuard, RunLock};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        }
    }
}

/// Redis run lock configuration.
#[derive(Debug, Clone)]
pub struct RedisRunLockConfig {
    pub redis: RedisConfig,
    /// Lock key shared by every publisher instance.
    pub key: String,
    /// Lease length; a crashed holder's lock expires after this.
    pub ttl: Duration,
}

impl Default for RedisRunLockConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            key: "pressroom:publisher:lock".to_string(),
            ttl: Duration::from_secs(300),
        }
    }
}

impl RedisRunLockConfig {
    pub fn from_env() -> Self {
        Self {
            redis: RedisConfig::from_env(),
            key: std::env::var("RUN_LOCK_KEY")
                .unwrap_or_else(|_| "pressroom:publisher:lock".to_string()),
            ttl: Duration::from_secs(
                std::env::var("RUN_LOCK_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
        }
    }
}

/// Redis-backed run lock shared across publisher processes.
pub struct RedisRunLock {
    conn: ConnectionManager,
    config: RedisRunLockConfig,
    acquire: Script,
    release: Script,
}

impl RedisRunLock {
    pub async fn new(config: RedisRunLockConfig) -> Result<Self, LockError> {
        let client = Client::open(config.redis.url.as_str())
            .map_err(|e| LockError::Backend(e.to_string()))?;

        // Use timeout to prevent hanging if Redis is unreachable
        let conn_manager_fut = ConnectionManager::new(client);
        let conn = tokio::time::timeout(config.redis.connect_timeout, conn_manager_fut)
            .await
            .map_err(|_| LockError::Backend("Connection timed out".to_string()))?
            .map_err(|e| LockError::Backend(e.to_string()))?;

        // Returns 1 if the key was set, 0 if someone else holds it
        let acquire = Script::new(
            r#"
            if redis.call('SET', KEYS[1], ARGV[1], 'NX', 'PX', ARGV[2]) then
                return 1
            end
            return 0
            "#,
        );

        // Delete only if we still own the lease
        let release = Script::new(
            r#"
            if redis.call('GET', KEYS[1]) == ARGV[1] then
                return redis.call('DEL', KEYS[1])
            end
            return 0
            "#,
        );

        tracing::info!(url = %config.redis.url, key = %config.key, "Connected to Redis run lock");

        Ok(Self {
            conn,
            config,
            acquire,
            release,
        })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, LockError> {
        Self::new(RedisRunLockConfig::from_env()).await
    }
}

struct RedisGuard {
    conn: ConnectionManager,
    key: String,
    token: String,
    release: Script,
}

#[async_trait]
impl RunGuard for RedisGuard {
    async fn release(self: Box<Self>) -> Result<(), LockError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .release
            .key(&self.key)
            .arg(&self.token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| LockError::Backend(e.to_string()))?;

        if deleted == 0 {
            tracing::warn!(key = %self.key, "Run lock lease expired before release");
        }
        Ok(())
    }
}

#[async_trait]
impl RunLock for RedisRunLock {
    async fn try_acquire(&self) -> Result<Option<Box<dyn RunGuard>>, LockError> {
        let token = Uuid::new_v4().to_string();
        let mut conn = self.conn.clone();

        let acquired: i64 = self
            .acquire
            .key(&self.config.key)
            .arg(&token)
            .arg(self.config.ttl.as_millis() as u64)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| LockError::Backend(e.to_string()))?;

        if acquired == 0 {
            return Ok(None);
        }

        Ok(Some(Box::new(RedisGuard {
            conn: self.conn.clone(),
            key: self.config.key.clone(),
            token,
            release: self.release.clone(),
        })))
    }
}
