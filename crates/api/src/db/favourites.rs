//! Article favourites.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::PgPool;

use conduit_core::{ArticleId, UserId};

use super::RepositoryError;

/// Which users favourited which articles. All writes are idempotent.
#[async_trait]
pub trait FavouriteStore: Send + Sync {
    /// Record that `user` favourited `article`.
    async fn favourite(&self, user: UserId, article: ArticleId) -> Result<(), RepositoryError>;

    /// Remove the favourite, if any.
    async fn unfavourite(&self, user: UserId, article: ArticleId) -> Result<(), RepositoryError>;

    /// The subset of `articles` that `user` has favourited.
    async fn favourited_among(
        &self,
        user: UserId,
        articles: &[ArticleId],
    ) -> Result<HashSet<ArticleId>, RepositoryError>;

    /// Favourite counts for `articles`. Articles nobody favourited are absent.
    async fn counts(
        &self,
        articles: &[ArticleId],
    ) -> Result<HashMap<ArticleId, u64>, RepositoryError>;
}

/// `PostgreSQL` favourite store.
#[derive(Clone)]
pub struct PgFavouriteStore {
    pool: PgPool,
}

impl PgFavouriteStore {
    /// Create a new favourite store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_i64(ids: &[ArticleId]) -> Vec<i64> {
    ids.iter().map(ArticleId::as_i64).collect()
}

#[async_trait]
impl FavouriteStore for PgFavouriteStore {
    async fn favourite(&self, user: UserId, article: ArticleId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO article_favourites (user_id, article_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(user)
        .bind(article)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn unfavourite(&self, user: UserId, article: ArticleId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM article_favourites WHERE user_id = $1 AND article_id = $2")
            .bind(user)
            .bind(article)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn favourited_among(
        &self,
        user: UserId,
        articles: &[ArticleId],
    ) -> Result<HashSet<ArticleId>, RepositoryError> {
        if articles.is_empty() {
            return Ok(HashSet::new());
        }

        let ids = sqlx::query_scalar::<_, ArticleId>(
            r"
            SELECT article_id FROM article_favourites
            WHERE user_id = $1 AND article_id = ANY($2)
            ",
        )
        .bind(user)
        .bind(to_i64(articles))
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn counts(
        &self,
        articles: &[ArticleId],
    ) -> Result<HashMap<ArticleId, u64>, RepositoryError> {
        if articles.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, (ArticleId, i64)>(
            r"
            SELECT article_id, COUNT(*)
            FROM article_favourites
            WHERE article_id = ANY($1)
            GROUP BY article_id
            ",
        )
        .bind(to_i64(articles))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, count)| {
                u64::try_from(count)
                    .map(|count| (id, count))
                    .map_err(|_| RepositoryError::DataCorruption(format!("negative count {count}")))
            })
            .collect()
    }
}
