//! # Pressroom Infrastructure
//!
//! Concrete implementations of the ports defined in `pressroom-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL post storage via SeaORM
//! - `redis` - Redis-backed run lock for multi-instance deployments

pub mod database;
pub mod lock;

// Re-exports - In-Memory
pub use database::{DatabaseConfig, InMemoryPostRepository};
pub use lock::InMemoryRunLock;

// Re-exports - Postgres
#[cfg(feature = "postgres")]
pub use database::PostgresPostRepository;

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use lock::{RedisConfig, RedisRunLock, RedisRunLockConfig};
