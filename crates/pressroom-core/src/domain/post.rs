use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UnknownStatus;

/// Stored editorial status of a post.
///
/// There is no "scheduled" status: a scheduled post is a draft with a
/// future `scheduled_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Public visibility of a post at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Draft,
    Scheduled,
    Live,
}

/// The fields the publication state machine reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationState {
    pub status: PostStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl PublicationState {
    /// State of a post that has never been saved.
    pub fn new_post() -> Self {
        Self {
            status: PostStatus::Draft,
            published_at: None,
            scheduled_at: None,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published && self.published_at.is_some()
    }

    /// Live means visible to the public right now.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == PostStatus::Published && self.published_at.is_some_and(|at| at <= now)
    }

    /// Whether the runner should pick this post up at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == PostStatus::Draft && self.scheduled_at.is_some_and(|at| at <= now)
    }

    pub fn visibility(&self, now: DateTime<Utc>) -> Visibility {
        if self.is_live(now) {
            return Visibility::Live;
        }
        match self.status {
            // Published with a future publish date.
            PostStatus::Published if self.published_at.is_some() => Visibility::Scheduled,
            PostStatus::Draft if self.scheduled_at.is_some_and(|at| at > now) => {
                Visibility::Scheduled
            }
            _ => Visibility::Draft,
        }
    }
}

impl Default for PublicationState {
    fn default() -> Self {
        Self::new_post()
    }
}

/// Post entity - represents a blog post or article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: PostStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new draft post.
    pub fn new(user_id: Uuid, title: String, content: String, now: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4();
        let slug = slugify(&title, id);
        Self {
            id,
            user_id,
            title,
            slug,
            content,
            status: PostStatus::Draft,
            published_at: None,
            scheduled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn publication(&self) -> PublicationState {
        PublicationState {
            status: self.status,
            published_at: self.published_at,
            scheduled_at: self.scheduled_at,
        }
    }

    /// Overwrite the publication fields and bump `updated_at`.
    pub fn apply(&mut self, next: PublicationState, now: DateTime<Utc>) {
        self.status = next.status;
        self.published_at = next.published_at;
        self.scheduled_at = next.scheduled_at;
        self.updated_at = now;
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.publication().is_live(now)
    }

    pub fn visibility(&self, now: DateTime<Utc>) -> Visibility {
        self.publication().visibility(now)
    }
}

/// URL slug derived from a title; falls back to `post-<id prefix>`.
pub fn slugify(title: &str, id: Uuid) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        let simple = id.simple().to_string();
        format!("post-{}", &simple[..8])
    } else {
        slug
    }
}
