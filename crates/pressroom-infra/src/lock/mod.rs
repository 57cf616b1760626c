//! Run lock implementations - in-process and Redis.

mod memory;

pub use memory::InMemoryRunLock;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisConfig, RedisRunLock, RedisRunLockConfig};
