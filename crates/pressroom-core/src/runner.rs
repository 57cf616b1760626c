//! Scheduled publication runner.
//!
//! One invocation (a "tick") selects every due draft and publishes each one
//! independently:
//!
//! ```text
//! Idle -> Selecting -> Processing(post_i) -> Idle
//!             \-> Idle (selection failed, nothing processed)
//! ```
//!
//! Re-running is safe: published posts no longer match the selection, and the
//! per-post write only lands while the stored row is still a draft scheduled at
//! the selected time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Post;
use crate::error::RunnerError;
use crate::ports::{Clock, PostRepository, RunLock};
use crate::publication::publish_due;

/// Result of processing one selected post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Published { published_at: DateTime<Utc> },
    /// The stored post changed under us; nothing was written.
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostOutcome {
    pub post_id: Uuid,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Per-tick report, in selection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<PostOutcome>,
}

impl RunReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            outcomes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn published(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Published { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }
}

/// Publishes due scheduled posts.
pub struct ScheduledPublicationRunner {
    posts: Arc<dyn PostRepository>,
    lock: Option<Arc<dyn RunLock>>,
}

impl ScheduledPublicationRunner {
    pub fn new(posts: Arc<dyn PostRepository>) -> Self {
        Self { posts, lock: None }
    }

    /// Guard every invocation with `lock`; a tick that cannot take it is skipped.
    pub fn with_lock(mut self, lock: Arc<dyn RunLock>) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Run one tick at the clock's current time.
    pub async fn tick(&self, clock: &dyn Clock) -> Result<RunReport, RunnerError> {
        self.run_once(clock.now()).await
    }

    /// Publish every post due at `now`.
    ///
    /// Only a failed selection (or an unavailable lock) is an error; per-post
    /// failures are recorded in the report.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RunReport, RunnerError> {
        let guard = match &self.lock {
            Some(lock) => match lock.try_acquire().await? {
                Some(guard) => Some(guard),
                None => {
                    tracing::warn!("Publication run already in progress, skipping tick");
                    return Err(RunnerError::AlreadyRunning);
                }
            },
            None => None,
        };

        let result = self.process(now).await;

        if let Some(guard) = guard {
            if let Err(e) = guard.release().await {
                tracing::error!(error = %e, "Failed to release run lock");
            }
        }

        result
    }

    async fn process(&self, now: DateTime<Utc>) -> Result<RunReport, RunnerError> {
        let due = self.posts.find_due_scheduled(now).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to select due scheduled posts");
            RunnerError::Selection(e)
        })?;

        let mut report = RunReport::new(now);
        if due.is_empty() {
            tracing::debug!("No scheduled posts due");
            return Ok(report);
        }

        let selected = due.len();
        for post in due {
            let post_id = post.id;
            let outcome = self.publish(post, now).await;
            report.outcomes.push(PostOutcome { post_id, outcome });
        }

        tracing::info!(
            selected,
            published = report.published(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Scheduled publication run finished"
        );

        Ok(report)
    }

    async fn publish(&self, mut post: Post, now: DateTime<Utc>) -> Outcome {
        let due = publish_due(&post.publication(), now);
        let (Some(scheduled_at), Some(next)) = (post.scheduled_at, due) else {
            tracing::warn!(post_id = %post.id, "Selected post is not due, skipping");
            return Outcome::Skipped;
        };

        post.apply(next, now);
        let published_at = next.published_at.unwrap_or(scheduled_at);

        match self.posts.save_if_due(&post, scheduled_at).await {
            Ok(true) => {
                tracing::info!(
                    post_id = %post.id,
                    title = %post.title,
                    published_at = %published_at,
                    "Scheduled post published"
                );
                Outcome::Published { published_at }
            }
            Ok(false) => {
                tracing::warn!(post_id = %post.id, "Post changed before it could be published, skipping");
                Outcome::Skipped
            }
            Err(e) => {
                tracing::error!(post_id = %post.id, error = %e, "Failed to publish scheduled post");
                Outcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::domain::PostStatus;
    use crate::error::RepoError;
    use crate::ports::{BaseRepository, FixedClock, LockError, RunGuard};

    #[derive(Default)]
    struct TestStore {
        posts: Mutex<Vec<Post>>,
        failing: HashSet<Uuid>,
        fail_selection: bool,
    }

    impl TestStore {
        fn get(&self, id: Uuid) -> Post {
            self.posts
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .unwrap()
        }

        fn insert(&self, post: Post) {
            self.posts.lock().unwrap().push(post);
        }
    }

    #[async_trait]
    impl BaseRepository<Post, Uuid> for TestStore {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
            Ok(self.posts.lock().unwrap().iter().find(|p| p.id == id).cloned())
        }

        async fn save(&self, post: Post) -> Result<Post, RepoError> {
            let mut posts = self.posts.lock().unwrap();
            posts.retain(|p| p.id != post.id);
            posts.push(post.clone());
            Ok(post)
        }

        async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
            self.posts.lock().unwrap().retain(|p| p.id != id);
            Ok(())
        }
    }

    #[async_trait]
    impl PostRepository for TestStore {
        async fn find_due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError> {
            if self.fail_selection {
                return Err(RepoError::Connection("refused".to_string()));
            }
            Ok(self
                .posts
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.publication().is_due(now))
                .cloned()
                .collect())
        }

        async fn save_if_due(&self, post: &Post, scheduled_at: DateTime<Utc>) -> Result<bool, RepoError> {
            if self.failing.contains(&post.id) {
                return Err(RepoError::Query("disk full".to_string()));
            }
            let mut posts = self.posts.lock().unwrap();
            match posts.iter_mut().find(|p| p.id == post.id) {
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
                .posts
                .lock()
                .unwrap()
                .iter()
                .any(|p| p.slug == slug && Some(p.id) != exclude))
        }

        async fn find_live(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError> {
            Ok(self
                .posts
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.is_live(now))
                .cloned()
                .collect())
        }
    }

    struct HeldLock;

    #[async_trait]
    impl RunLock for HeldLock {
        async fn try_acquire(&self) -> Result<Option<Box<dyn RunGuard>>, LockError> {
            Ok(None)
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 14, 9, 0, 0).unwrap()
    }

    fn scheduled_post(at: DateTime<Utc>) -> Post {
        let mut post = Post::new(Uuid::new_v4(), "Scheduled".into(), "Body".into(), t0());
        post.scheduled_at = Some(at);
        post
    }

    #[tokio::test]
    async fn test_publishes_due_post_at_scheduled_time() {
        let store = Arc::new(TestStore::default());
        let at = t0() + Duration::hours(1);
        let post = scheduled_post(at);
        store.insert(post.clone());

        let runner = ScheduledPublicationRunner::new(store.clone());
        let report = runner.run_once(t0() + Duration::minutes(75)).await.unwrap();

        assert_eq!(
            report.outcomes,
            vec![PostOutcome {
                post_id: post.id,
                outcome: Outcome::Published { published_at: at },
            }]
        );

        let stored = store.get(post.id);
        assert_eq!(stored.status, PostStatus::Published);
        assert_eq!(stored.published_at, Some(at));
        assert_eq!(stored.scheduled_at, None);
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let store = Arc::new(TestStore::default());
        let post = scheduled_post(t0());
        store.insert(post.clone());

        let runner = ScheduledPublicationRunner::new(store.clone());
        let clock = FixedClock::new(t0() + Duration::minutes(1));

        assert_eq!(runner.tick(&clock).await.unwrap().published(), 1);
        clock.advance(Duration::minutes(1));
        assert!(runner.tick(&clock).await.unwrap().is_empty());
        assert_eq!(store.get(post.id).published_at, Some(t0()));
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_stop_batch() {
        let first = scheduled_post(t0());
        let second = scheduled_post(t0());
        let third = scheduled_post(t0());

        let store = Arc::new(TestStore {
            failing: HashSet::from([second.id]),
            ..Default::default()
        });
        for post in [&first, &second, &third] {
            store.insert(post.clone());
        }

        let runner = ScheduledPublicationRunner::new(store.clone());
        let report = runner.run_once(t0()).await.unwrap();

        let ids: Vec<Uuid> = report.outcomes.iter().map(|o| o.post_id).collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);
        assert!(matches!(report.outcomes[0].outcome, Outcome::Published { .. }));
        assert!(matches!(report.outcomes[1].outcome, Outcome::Failed { .. }));
        assert!(matches!(report.outcomes[2].outcome, Outcome::Published { .. }));

        assert_eq!(store.get(second.id).status, PostStatus::Draft);
        assert_eq!(store.get(third.id).status, PostStatus::Published);
    }

    /// Hands out a stale copy of each due post, then lets the author
    /// reschedule it before the runner writes.
    struct RescheduledDuringTick {
        inner: TestStore,
        moved_to: DateTime<Utc>,
    }

    #[async_trait]
    impl BaseRepository<Post, Uuid> for RescheduledDuringTick {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
            self.inner.find_by_id(id).await
        }

        async fn save(&self, post: Post) -> Result<Post, RepoError> {
            self.inner.save(post).await
        }

        async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
            self.inner.delete(id).await
        }
    }

    #[async_trait]
    impl PostRepository for RescheduledDuringTick {
        async fn find_due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError> {
            let due = self.inner.find_due_scheduled(now).await?;
            for post in &due {
                let mut edited = post.clone();
                edited.scheduled_at = Some(self.moved_to);
                edited.title = "Edited title".into();
                self.inner.save(edited).await?;
            }
            Ok(due)
        }

        async fn save_if_due(&self, post: &Post, scheduled_at: DateTime<Utc>) -> Result<bool, RepoError> {
            self.inner.save_if_due(post, scheduled_at).await
        }

        async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, RepoError> {
            self.inner.slug_exists(slug, exclude).await
        }

        async fn find_live(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError> {
            self.inner.find_live(now).await
        }
    }

    #[tokio::test]
    async fn test_reschedule_after_selection_is_skipped() {
        let post = scheduled_post(t0());
        let tomorrow = t0() + Duration::days(1);
        let store = Arc::new(RescheduledDuringTick {
            inner: TestStore::default(),
            moved_to: tomorrow,
        });
        store.inner.insert(post.clone());

        let runner = ScheduledPublicationRunner::new(store.clone());
        let report = runner.run_once(t0() + Duration::minutes(1)).await.unwrap();

        assert_eq!(report.skipped(), 1);
        assert_eq!(report.published(), 0);

        let stored = store.inner.get(post.id);
        assert_eq!(stored.status, PostStatus::Draft);
        assert_eq!(stored.published_at, None);
        assert_eq!(stored.scheduled_at, Some(tomorrow));
        assert_eq!(stored.title, "Edited title");
    }

    #[tokio::test]
    async fn test_selection_failure_is_fatal() {
        let store = Arc::new(TestStore {
            fail_selection: true,
            ..Default::default()
        });
        let runner = ScheduledPublicationRunner::new(store);

        let err = runner.run_once(t0()).await.unwrap_err();
        assert!(matches!(err, RunnerError::Selection(RepoError::Connection(_))));
    }

    #[tokio::test]
    async fn test_held_lock_skips_tick() {
        let store = Arc::new(TestStore::default());
        let post = scheduled_post(t0());
        store.insert(post.clone());

        let runner = ScheduledPublicationRunner::new(store.clone()).with_lock(Arc::new(HeldLock));

        let err = runner.run_once(t0()).await.unwrap_err();
        assert!(matches!(err, RunnerError::AlreadyRunning));
        assert_eq!(store.get(post.id).status, PostStatus::Draft);
    }

    #[test]
    fn test_report_serializes_flat_outcomes() {
        let id = Uuid::nil();
        let report = RunReport {
            started_at: t0(),
            outcomes: vec![PostOutcome {
                post_id: id,
                outcome: Outcome::Failed {
                    reason: "boom".into(),
                },
            }],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcomes"][0]["outcome"], "failed");
        assert_eq!(json["outcomes"][0]["reason"], "boom");
        assert_eq!(json["outcomes"][0]["post_id"], id.to_string());
    }
}
