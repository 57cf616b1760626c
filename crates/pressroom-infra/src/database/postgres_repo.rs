//! PostgreSQL post repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DbConn, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use pressroom_core::domain::Post;
use pressroom_core::error::RepoError;
use pressroom_core::ports::{BaseRepository, PostRepository};

use super::entity::post::{self, ActiveModel, Entity as PostEntity, Status};

/// PostgreSQL post repository.
pub struct PostgresPostRepository {
    db: DbConn,
}

impl PostgresPostRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

fn query_error(e: DbErr) -> RepoError {
    match e {
        DbErr::Conn(e) => RepoError::Connection(e.to_string()),
        DbErr::ConnectionAcquire(e) => RepoError::Connection(e.to_string()),
        other => {
            let err_str = other.to_string();
            if err_str.contains("duplicate") || err_str.contains("unique") {
                RepoError::Constraint(err_str)
            } else {
                RepoError::Query(err_str)
            }
        }
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for PostgresPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let result = PostEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(query_error)?;

        Ok(result.map(Into::into))
    }

    /// Upsert on the primary key.
    async fn save(&self, post: Post) -> Result<Post, RepoError> {
        let active: ActiveModel = post.clone().into();

        PostEntity::insert(active)
            .on_conflict(
                OnConflict::column(post::Column::Id)
                    .update_columns([
                        post::Column::Title,
                        post::Column::Slug,
                        post::Column::Content,
                        post::Column::Status,
                        post::Column::PublishedAt,
                        post::Column::ScheduledAt,
                        post::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(query_error)?;

        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let result = PostEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(query_error)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::Status.eq(Status::Draft))
            .filter(post::Column::ScheduledAt.is_not_null())
            .filter(post::Column::ScheduledAt.lte(now))
            .order_by_asc(post::Column::ScheduledAt)
            .all(&self.db)
            .await
            .map_err(query_error)?;

        tracing::debug!(count = result.len(), "Selected due scheduled posts");
        Ok(result.into_iter().map(Into::into).collect())
    }

    /// `UPDATE posts SET status, published_at, scheduled_at, updated_at
    /// WHERE id = $1 AND status = 'draft' AND scheduled_at = $2`
    async fn save_if_due(&self, post: &Post, scheduled_at: DateTime<Utc>) -> Result<bool, RepoError> {
        let publication = ActiveModel {
            status: Set(post.status.into()),
            published_at: Set(post.published_at.map(Into::into)),
            scheduled_at: Set(post.scheduled_at.map(Into::into)),
            updated_at: Set(post.updated_at.into()),
            ..Default::default()
        };

        let result = PostEntity::update_many()
            .set(publication)
            .filter(post::Column::Id.eq(post.id))
            .filter(post::Column::Status.eq(Status::Draft))
            .filter(post::Column::ScheduledAt.eq(scheduled_at))
            .exec(&self.db)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected == 1)
    }

    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, RepoError> {
        let mut query = PostEntity::find().filter(post::Column::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(post::Column::Id.ne(id));
        }

        let found = query.one(&self.db).await.map_err(query_error)?;
        Ok(found.is_some())
    }

    async fn find_live(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::Status.eq(Status::Published))
            .filter(post::Column::PublishedAt.is_not_null())
            .filter(post::Column::PublishedAt.lte(now))
            .order_by_desc(post::Column::PublishedAt)
            .all(&self.db)
            .await
            .map_err(query_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}
