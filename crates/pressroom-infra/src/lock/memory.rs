//! In-process run lock.
//!
//! Enough when a single publisher instance runs the schedule. Use the Redis
//! lock when several instances share one database.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use pressroom_core::ports::{LockError, RunGuard, RunLock};

#[derive(Clone, Default)]
pub struct InMemoryRunLock {
    inner: Arc<Mutex<()>>,
}

impl InMemoryRunLock {
    pub fn new() -> Self {
        Self::default()
    }
}

struct InMemoryGuard(OwnedMutexGuard<()>);

#[async_trait]
impl RunGuard for InMemoryGuard {
    async fn release(self: Box<Self>) -> Result<(), LockError> {
        drop(self.0);
        Ok(())
    }
}

#[async_trait]
impl RunLock for InMemoryRunLock {
    async fn try_acquire(&self) -> Result<Option<Box<dyn RunGuard>>, LockError> {
        match self.inner.clone().try_lock_owned() {
            Ok(guard) => Ok(Some(Box::new(InMemoryGuard(guard)))),
            Err(_) => Ok(None),
        }
    }
}
