//! Credential store: user persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use conduit_core::{Email, UserId, Username};

use super::{RepositoryError, map_unique_violation};
use crate::models::{NewUser, User, UserChanges};

/// Unique constraints on `users`, mapped to the field they protect.
const USER_CONSTRAINTS: &[(&str, &str)] = &[
    ("users_email_key", "email"),
    ("users_username_key", "username"),
];

/// Read and write access to registered users.
///
/// Implementations must enforce email and username uniqueness and report a
/// violation as `RepositoryError::Conflict("email" | "username")`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by ID.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Look up several users at once. Missing IDs are skipped.
    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError>;

    /// Look up a user by (normalized) email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Look up a user by username.
    async fn find_by_username(&self, username: &Username)
    -> Result<Option<User>, RepositoryError>;

    /// Look up a user together with their password hash, for login only.
    async fn find_credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Insert a new user.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Apply a partial update. Returns `RepositoryError::NotFound` for an unknown ID.
    async fn update(&self, id: UserId, changes: UserChanges) -> Result<User, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    username: String,
    bio: Option<String>,
    image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: Email::from_trusted(row.email),
            username: Username::from_trusted(row.username),
            bio: row.bio,
            image: row.image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// `PostgreSQL` user store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, username, bio, image, created_at, updated_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = ids.iter().map(UserId::as_i64).collect();

        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, username, bio, image, created_at, updated_at
            FROM users
            WHERE id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, username, bio, image, created_at, updated_at
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, username, bio, image, created_at, updated_at
            FROM users
            WHERE username = $1
            ",
        )
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT id, email, username, bio, image, created_at, updated_at, password_hash
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| (User::from(r.user), r.password_hash)))
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (email, username, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, username, bio, image, created_at, updated_at
            ",
        )
        .bind(user.email.as_str())
        .bind(user.username.as_str())
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, USER_CONSTRAINTS))?;

        Ok(row.into())
    }

    async fn update(&self, id: UserId, changes: UserChanges) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE users SET
                email = COALESCE($2, email),
                username = COALESCE($3, username),
                password_hash = COALESCE($4, password_hash),
                bio = CASE WHEN $5 THEN $6 ELSE bio END,
                image = CASE WHEN $7 THEN $8 ELSE image END,
                updated_at = now()
            WHERE id = $1
            RETURNING id, email, username, bio, image, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(changes.email.as_ref().map(Email::as_str))
        .bind(changes.username.as_ref().map(Username::as_str))
        .bind(changes.password_hash.as_deref())
        .bind(changes.bio.is_some())
        .bind(changes.bio.flatten())
        .bind(changes.image.is_some())
        .bind(changes.image.flatten())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, USER_CONSTRAINTS))?;

        row.map(User::from).ok_or(RepositoryError::NotFound)
    }
}
