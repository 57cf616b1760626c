//! Authoring service - how create/edit flows drive the publication state machine.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Post, slugify};
use crate::error::{AuthoringError, RepoError};
use crate::ports::{Clock, PostRepository};
use crate::publication::{Intent, transition};

pub struct AuthoringService {
    posts: Arc<dyn PostRepository>,
    clock: Arc<dyn Clock>,
}

impl AuthoringService {
    pub fn new(posts: Arc<dyn PostRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { posts, clock }
    }

    /// Create a post and apply the author's publication intent.
    ///
    /// A rejected intent (bad schedule time) saves nothing.
    pub async fn create(
        &self,
        user_id: Uuid,
        title: String,
        content: String,
        intent: &Intent,
    ) -> Result<Post, AuthoringError> {
        let now = self.clock.now();
        let mut post = Post::new(user_id, title, content, now);

        let next = transition(&post.publication(), intent, now)?;
        post.apply(next, now);
        post.slug = self.unique_slug(&post.slug, None).await?;

        let saved = self.posts.save(post).await?;
        tracing::info!(post_id = %saved.id, status = %saved.status, "Post created");
        Ok(saved)
    }

    /// Apply an intent to an existing post.
    ///
    /// This is an unconditional write: if the runner publishes the post at
    /// the same moment, the last write wins.
    pub async fn apply_intent(&self, post_id: Uuid, intent: &Intent) -> Result<Post, AuthoringError> {
        let mut post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(AuthoringError::NotFound(post_id))?;

        let now = self.clock.now();
        let next = transition(&post.publication(), intent, now)?;
        post.apply(next, now);

        let saved = self.posts.save(post).await?;
        tracing::info!(
            post_id = %saved.id,
            status = %saved.status,
            scheduled_at = ?saved.scheduled_at,
            "Post publication state updated"
        );
        Ok(saved)
    }

    /// Replace the title and content of a post and apply an intent.
    ///
    /// A changed title gets a fresh slug; an unchanged one keeps its URL.
    pub async fn edit(
        &self,
        post_id: Uuid,
        title: String,
        content: String,
        intent: &Intent,
    ) -> Result<Post, AuthoringError> {
        let mut post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(AuthoringError::NotFound(post_id))?;

        let now = self.clock.now();
        let next = transition(&post.publication(), intent, now)?;

        if title != post.title {
            post.slug = self
                .unique_slug(&slugify(&title, post.id), Some(post.id))
                .await?;
            post.title = title;
        }
        post.content = content;
        post.apply(next, now);

        let saved = self.posts.save(post).await?;
        tracing::info!(post_id = %saved.id, slug = %saved.slug, "Post edited");
        Ok(saved)
    }

    /// `base`, or `base-1`, `base-2`, ... whichever is first unused by
    /// another post.
    async fn unique_slug(&self, base: &str, exclude: Option<Uuid>) -> Result<String, RepoError> {
        let mut slug = base.to_string();
        let mut suffix = 1;
        while self.posts.slug_exists(&slug, exclude).await? {
            slug = format!("{base}-{suffix}");
            suffix += 1;
        }
        Ok(slug)
    }

    /// The post, only if the public may see it right now.
    pub async fn find_live(&self, post_id: Uuid) -> Result<Option<Post>, AuthoringError> {
        let now = self.clock.now();
        let post = self.posts.find_by_id(post_id).await?;
        Ok(post.filter(|p| p.is_live(now)))
    }

    /// All live posts, newest first.
    pub async fn list_live(&self) -> Result<Vec<Post>, AuthoringError> {
        Ok(self.posts.find_live(self.clock.now()).await?)
    }
}
