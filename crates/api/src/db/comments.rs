//! Comment persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use conduit_core::{ArticleId, CommentId, UserId};

use super::RepositoryError;
use crate::models::{Comment, NewComment};

/// Read and write access to comments.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Insert a new comment.
    async fn create(&self, comment: NewComment) -> Result<Comment, RepositoryError>;

    /// Look up a comment by ID.
    async fn find_by_id(&self, id: CommentId) -> Result<Option<Comment>, RepositoryError>;

    /// All comments on an article, oldest first.
    async fn list_for_article(&self, article: ArticleId)
    -> Result<Vec<Comment>, RepositoryError>;

    /// Delete a comment. Returns `false` if it did not exist.
    async fn delete(&self, id: CommentId) -> Result<bool, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: CommentId,
    article_id: ArticleId,
    author_id: UserId,
    body: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            article_id: row.article_id,
            author_id: row.author_id,
            body: row.body,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `PostgreSQL` comment store.
#[derive(Clone)]
pub struct PgCommentStore {
    pool: PgPool,
}

impl PgCommentStore {
    /// Create a new comment store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn create(&self, comment: NewComment) -> Result<Comment, RepositoryError> {
        let row = sqlx::query_as::<_, CommentRow>(
            r"
            INSERT INTO comments (article_id, author_id, body)
            VALUES ($1, $2, $3)
            RETURNING id, article_id, author_id, body, created_at, updated_at
            ",
        )
        .bind(comment.article_id)
        .bind(comment.author_id)
        .bind(&comment.body)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: CommentId) -> Result<Option<Comment>, RepositoryError> {
        let row = sqlx::query_as::<_, CommentRow>(
            r"
            SELECT id, article_id, author_id, body, created_at, updated_at
            FROM comments
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Comment::from))
    }

    async fn list_for_article(
        &self,
        article: ArticleId,
    ) -> Result<Vec<Comment>, RepositoryError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r"
            SELECT id, article_id, author_id, body, created_at, updated_at
            FROM comments
            WHERE article_id = $1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(article)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn delete(&self, id: CommentId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
