//! Article persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use conduit_core::{ArticleId, Page, Slug, UserId};

use super::{RepositoryError, map_unique_violation};
use crate::models::{Article, ArticleChanges, ArticleFilter, NewArticle};

const ARTICLE_CONSTRAINTS: &[(&str, &str)] = &[("articles_slug_key", "slug")];

/// Read and write access to articles.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert a new article. A taken slug is `RepositoryError::Conflict("slug")`.
    async fn create(&self, article: NewArticle) -> Result<Article, RepositoryError>;

    /// Look up an article by slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Article>, RepositoryError>;

    /// Apply a partial update and refresh `updated_at`.
    async fn update(
        &self,
        id: ArticleId,
        changes: ArticleChanges,
    ) -> Result<Article, RepositoryError>;

    /// Delete an article with its comments and favourites.
    /// Returns `false` if it did not exist.
    async fn delete(&self, id: ArticleId) -> Result<bool, RepositoryError>;

    /// Newest-first listing matching `filter`, plus the total match count.
    async fn list(
        &self,
        filter: &ArticleFilter,
        page: Page,
    ) -> Result<(Vec<Article>, u64), RepositoryError>;

    /// Every tag in use, sorted.
    async fn tags(&self) -> Result<Vec<String>, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: ArticleId,
    slug: String,
    title: String,
    description: String,
    body: String,
    tags: Vec<String>,
    author_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            slug: Slug::from_trusted(row.slug),
            title: row.title,
            description: row.description,
            body: row.body,
            tags: row.tags,
            author_id: row.author_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Shared `WHERE` clause for listings; parameters `$1..=$4` are the filter.
const LIST_FILTER: &str = r"
    WHERE ($1::text IS NULL OR $1 = ANY(a.tags))
      AND ($2::bigint IS NULL OR a.author_id = $2)
      AND ($3::bigint IS NULL OR EXISTS (
            SELECT 1 FROM article_favourites f
            WHERE f.article_id = a.id AND f.user_id = $3))
      AND ($4::bigint[] IS NULL OR a.author_id = ANY($4))
";

/// `PostgreSQL` article store.
#[derive(Clone)]
pub struct PgArticleStore {
    pool: PgPool,
}

impl PgArticleStore {
    /// Create a new article store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn create(&self, article: NewArticle) -> Result<Article, RepositoryError> {
        let row = sqlx::query_as::<_, ArticleRow>(
            r"
            INSERT INTO articles (slug, title, description, body, tags, author_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, slug, title, description, body, tags, author_id, created_at, updated_at
            ",
        )
        .bind(article.slug.as_str())
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.body)
        .bind(&article.tags)
        .bind(article.author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, ARTICLE_CONSTRAINTS))?;

        Ok(row.into())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Article>, RepositoryError> {
        let row = sqlx::query_as::<_, ArticleRow>(
            r"
            SELECT id, slug, title, description, body, tags, author_id, created_at, updated_at
            FROM articles
            WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Article::from))
    }

    async fn update(
        &self,
        id: ArticleId,
        changes: ArticleChanges,
    ) -> Result<Article, RepositoryError> {
        let (title, slug) = changes.title.unzip();

        let row = sqlx::query_as::<_, ArticleRow>(
            r"
            UPDATE articles SET
                slug = COALESCE($2, slug),
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                body = COALESCE($5, body),
                updated_at = now()
            WHERE id = $1
            RETURNING id, slug, title, description, body, tags, author_id, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(slug.as_ref().map(Slug::as_str))
        .bind(title)
        .bind(changes.description)
        .bind(changes.body)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, ARTICLE_CONSTRAINTS))?;

        row.map(Article::from).ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, id: ArticleId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        filter: &ArticleFilter,
        page: Page,
    ) -> Result<(Vec<Article>, u64), RepositoryError> {
        let authors: Option<Vec<i64>> = filter
            .authors
            .as_ref()
            .map(|ids| ids.iter().map(UserId::as_i64).collect());

        let select = format!(
            r"
            SELECT a.id, a.slug, a.title, a.description, a.body, a.tags, a.author_id,
                   a.created_at, a.updated_at
            FROM articles a
            {LIST_FILTER}
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT $5 OFFSET $6
            "
        );
        let rows = sqlx::query_as::<_, ArticleRow>(&select)
            .bind(filter.tag.as_deref())
            .bind(filter.author)
            .bind(filter.favourited_by)
            .bind(authors.as_deref())
            .bind(i64::from(page.limit()))
            .bind(i64::from(page.offset()))
            .fetch_all(&self.pool)
            .await?;

        let count = format!("SELECT COUNT(*) FROM articles a {LIST_FILTER}");
        let total: i64 = sqlx::query_scalar(&count)
            .bind(filter.tag.as_deref())
            .bind(filter.author)
            .bind(filter.favourited_by)
            .bind(authors.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let total = u64::try_from(total)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative count {total}")))?;

        Ok((rows.into_iter().map(Article::from).collect(), total))
    }

    async fn tags(&self) -> Result<Vec<String>, RepositoryError> {
        let tags = sqlx::query_scalar::<_, String>(
            r"
            SELECT DISTINCT tag
            FROM articles, unnest(articles.tags) AS tag
            ORDER BY tag
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }
}
