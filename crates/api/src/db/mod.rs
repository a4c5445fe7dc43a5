//! Persistence for Conduit.
//!
//! Each aggregate has a store trait (`UserStore`, `ArticleStore`, ...) with
//! two implementations:
//!
//! - `Pg*Store` - `PostgreSQL` via `sqlx`, used by the server binary
//! - [`memory::MemoryStore`] - a single in-process store implementing every
//!   trait, used by tests and local experiments
//!
//! ## Tables
//!
//! - `users` - credentials and profile (unique `email`, unique `username`)
//! - `articles` - articles with a `TEXT[]` tag list (unique `slug`)
//! - `comments` - comments, cascade-deleted with their article
//! - `follow_relations` - `(follower_id, followee_id)`
//! - `article_favourites` - `(user_id, article_id)`, cascade-deleted with their article
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p conduit-cli -- migrate
//! ```

pub mod articles;
pub mod comments;
pub mod favourites;
pub mod follows;
pub mod memory;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use articles::{ArticleStore, PgArticleStore};
pub use comments::{CommentStore, PgCommentStore};
pub use favourites::{FavouriteStore, PgFavouriteStore};
pub use follows::{FollowStore, PgFollowStore};
pub use memory::MemoryStore;
pub use users::{PgUserStore, UserStore};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation; carries the offending field name.
    #[error("{0} already exists")]
    Conflict(String),
}

/// Map a unique-violation on `constraint` to a `Conflict` naming `field`,
/// passing every other error through.
pub(crate) fn map_unique_violation(e: sqlx::Error, constraints: &[(&str, &str)]) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let field = db_err
            .constraint()
            .and_then(|name| {
                constraints
                    .iter()
                    .find(|(constraint, _)| *constraint == name)
                    .map(|(_, field)| *field)
            })
            .unwrap_or("record");
        return RepositoryError::Conflict(field.to_owned());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// The full set of stores, injected into services through `AppState`.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub articles: Arc<dyn ArticleStore>,
    pub comments: Arc<dyn CommentStore>,
    pub follows: Arc<dyn FollowStore>,
    pub favourites: Arc<dyn FavouriteStore>,
    pool: Option<PgPool>,
}

impl Stores {
    /// Stores backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserStore::new(pool.clone())),
            articles: Arc::new(PgArticleStore::new(pool.clone())),
            comments: Arc::new(PgCommentStore::new(pool.clone())),
            follows: Arc::new(PgFollowStore::new(pool.clone())),
            favourites: Arc::new(PgFavouriteStore::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Stores backed by one shared [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            users: store.clone(),
            articles: store.clone(),
            comments: store.clone(),
            follows: store.clone(),
            favourites: store,
            pool: None,
        }
    }

    /// Check that the backing database answers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the health-check query fails.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
