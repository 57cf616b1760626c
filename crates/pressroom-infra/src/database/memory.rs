//! In-memory post repository - used when no database is configured.
//!
//! Note: Data is lost on process restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use pressroom_core::domain::{Post, PostStatus};
use pressroom_core::error::RepoError;
use pressroom_core::ports::{BaseRepository, PostRepository};

/// Posts in a `HashMap` behind an async `RwLock`.
///
/// `save_if_due` checks and writes under one write lock, so it is a real
/// compare-and-swap within the process.
pub struct InMemoryPostRepository {
    store: RwLock<HashMap<Uuid, Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

impl Default for InMemoryPostRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.store.read().await.get(&id).cloned())
    }

    async fn save(&self, post: Post) -> Result<Post, RepoError> {
        let mut store = self.store.write().await;

        if store
            .values()
            .any(|existing| existing.slug == post.slug && existing.id != post.id)
        {
            return Err(RepoError::Constraint(format!(
                "slug {:?} already exists",
                post.slug
            )));
        }

        store.insert(post.id, post.clone());
        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        match self.store.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepoError::NotFound),
        }
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError> {
        let store = self.store.read().await;
        let mut due: Vec<Post> = store
            .values()
            .filter(|p| p.publication().is_due(now))
            .cloned()
            .collect();

        due.sort_by_key(|p| (p.scheduled_at, p.id));
        Ok(due)
    }

    async fn save_if_due(&self, post: &Post, scheduled_at: DateTime<Utc>) -> Result<bool, RepoError> {
        let mut store = self.store.write().await;
        match store.get_mut(&post.id) {
            Some(stored)
                if stored.status == PostStatus::Draft
                    && stored.scheduled_at == Some(scheduled_at) =>
            {
                stored.apply(post.publication(), post.updated_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, RepoError> {
        Ok(self
            .store
            .read()
            .await
            .values()
            .any(|p| p.slug == slug && Some(p.id) != exclude))
    }

    async fn find_live(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError> {
        let store = self.store.read().await;
        let mut live: Vec<Post> = store.values().filter(|p| p.is_live(now)).cloned().collect();

        live.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(live)
    }
}
