//! Run lock port - keeps publication runs from overlapping.

use async_trait::async_trait;

/// Exclusive lease over the publication runner.
#[async_trait]
pub trait RunLock: Send + Sync {
    /// Try to take the lock without waiting.
    /// Returns `Ok(None)` if another holder has it.
    async fn try_acquire(&self) -> Result<Option<Box<dyn RunGuard>>, LockError>;
}

/// Proof of holding a [`RunLock`]. Must be released when the run ends.
#[async_trait]
pub trait RunGuard: Send {
    async fn release(self: Box<Self>) -> Result<(), LockError>;
}

/// Run lock errors.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("Backend error: {0}")]
    Backend(String),
}
