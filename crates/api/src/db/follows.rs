//! Follow relations between users.

use async_trait::async_trait;
use sqlx::PgPool;

use conduit_core::UserId;

use super::RepositoryError;

/// Who follows whom. All writes are idempotent.
#[async_trait]
pub trait FollowStore: Send + Sync {
    /// Record that `follower` follows `followee`.
    async fn follow(&self, follower: UserId, followee: UserId) -> Result<(), RepositoryError>;

    /// Remove the relation, if any.
    async fn unfollow(&self, follower: UserId, followee: UserId) -> Result<(), RepositoryError>;

    /// Whether `follower` follows `followee`.
    async fn is_following(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> Result<bool, RepositoryError>;

    /// Everyone `follower` follows.
    async fn followees(&self, follower: UserId) -> Result<Vec<UserId>, RepositoryError>;
}

/// `PostgreSQL` follow store.
#[derive(Clone)]
pub struct PgFollowStore {
    pool: PgPool,
}

impl PgFollowStore {
    /// Create a new follow store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FollowStore for PgFollowStore {
    async fn follow(&self, follower: UserId, followee: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO follow_relations (follower_id, followee_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(follower)
        .bind(followee)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn unfollow(&self, follower: UserId, followee: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM follow_relations WHERE follower_id = $1 AND followee_id = $2")
            .bind(follower)
            .bind(followee)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn is_following(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM follow_relations
                WHERE follower_id = $1 AND followee_id = $2
            )
            ",
        )
        .bind(follower)
        .bind(followee)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn followees(&self, follower: UserId) -> Result<Vec<UserId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, UserId>(
            "SELECT followee_id FROM follow_relations WHERE follower_id = $1",
        )
        .bind(follower)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
