use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::Post;
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create or update).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// Post repository.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Drafts whose `scheduled_at` is set and not after `now`.
    async fn find_due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError>;

    /// Write the publication fields of `post` (`status`, `published_at`,
    /// `scheduled_at`, `updated_at`) only if the stored row is still a draft
    /// scheduled at exactly `scheduled_at`. Other columns are left untouched.
    ///
    /// Returns `Ok(false)` when the row is missing, no longer a draft, or was
    /// rescheduled.
    async fn save_if_due(&self, post: &Post, scheduled_at: DateTime<Utc>) -> Result<bool, RepoError>;

    /// Whether a post other than `exclude` already uses `slug`.
    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, RepoError>;

    /// Posts visible to the public at `now`, newest first.
    async fn find_live(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError>;
}
