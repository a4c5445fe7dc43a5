//! Authentication service.
//!
//! Provides registration, password login, account updates and token issue.

mod error;
mod password;

pub use error::AuthError;
pub use password::PasswordHasher;

use chrono::Utc;

use conduit_core::{Email, UserId, Username};

use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, User, UserChanges};
use crate::services::TokenService;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Client-supplied account changes, not yet validated.
///
/// For `bio` and `image`, `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bio: Option<Option<String>>,
    pub image: Option<Option<String>>,
}

/// Authentication service.
///
/// Handles user registration, login and account changes.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    hasher: &'a PasswordHasher,
    tokens: &'a TokenService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        users: &'a dyn UserStore,
        hasher: &'a PasswordHasher,
        tokens: &'a TokenService,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` / `InvalidUsername` for malformed input.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::AlreadyTaken` if the email or username is in use.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        let username = Username::parse(username)?;
        validate_password(password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::AlreadyTaken("email".to_owned()));
        }
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AuthError::AlreadyTaken("username".to_owned()));
        }

        let password_hash = self.hasher.hash(password)?;

        let user = self
            .users
            .create(NewUser {
                email,
                username,
                password_hash,
            })
            .await
            .map_err(conflict_to_taken)?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is malformed or
    /// unknown, or the password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let Some((user, password_hash)) = self.users.find_credentials_by_email(&email).await?
        else {
            self.hasher.verify_dummy(password);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &password_hash) {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Update the account of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AlreadyTaken` if a new email or username belongs to
    /// another user, `AuthError::UserNotFound` if the user vanished, and the
    /// validation errors of [`Self::register`] for malformed fields.
    pub async fn update(&self, user_id: UserId, update: UserUpdate) -> Result<User, AuthError> {
        let email = update.email.as_deref().map(Email::parse).transpose()?;
        let username = update.username.as_deref().map(Username::parse).transpose()?;

        if let Some(email) = &email
            && let Some(other) = self.users.find_by_email(email).await?
            && other.id != user_id
        {
            return Err(AuthError::AlreadyTaken("email".to_owned()));
        }
        if let Some(username) = &username
            && let Some(other) = self.users.find_by_username(username).await?
            && other.id != user_id
        {
            return Err(AuthError::AlreadyTaken("username".to_owned()));
        }

        let password_hash = match update.password.as_deref() {
            Some(password) => {
                validate_password(password)?;
                Some(self.hasher.hash(password)?)
            }
            None => None,
        };

        let changes = UserChanges {
            email,
            username,
            password_hash,
            bio: update.bio,
            image: update.image,
        };

        self.users
            .update(user_id, changes)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => conflict_to_taken(other),
            })
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Issue a bearer token for `user`, valid from now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        Ok(self.tokens.issue(user.id, Utc::now())?)
    }
}

fn conflict_to_taken(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::Conflict(field) => AuthError::AlreadyTaken(field),
        other => AuthError::Repository(other),
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::config::TokenConfig;
    use crate::db::MemoryStore;

    fn fixtures() -> (MemoryStore, PasswordHasher, TokenService) {
        let tokens = TokenService::new(&TokenConfig {
            secret: SecretString::from("q8Zr!3vLx@9TmK2#pW7s$Nd4&Hf6*Jb1"),
            session_lifetime: Duration::from_secs(3600),
        })
        .unwrap();
        (MemoryStore::default(), PasswordHasher::new(), tokens)
    }

    #[tokio::test]
    async fn test_register_then_login_resolves_token() {
        let (store, hasher, tokens) = fixtures();
        let auth = AuthService::new(&store, &hasher, &tokens);

        let alice = auth
            .register("a@x.com", "alice", "secret123")
            .await
            .unwrap();
        let user = auth.login("a@x.com", "secret123").await.unwrap();
        assert_eq!(user.id, alice.id);

        let token = auth.issue_token(&user).unwrap();
        assert_eq!(tokens.resolve(&token), Some(alice.id));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let (store, hasher, tokens) = fixtures();
        let auth = AuthService::new(&store, &hasher, &tokens);

        auth.register("a@x.com", "alice", "secret123").await.unwrap();
        let err = auth
            .register("A@X.com", "alice2", "secret123")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyTaken(ref f) if f == "email"));

        assert!(auth.login("a@x.com", "secret123").await.is_ok());
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (store, hasher, tokens) = fixtures();
        let auth = AuthService::new(&store, &hasher, &tokens);
        auth.register("a@x.com", "alice", "secret123").await.unwrap();

        for (email, password) in [
            ("a@x.com", "wrong-password"),
            ("nobody@x.com", "secret123"),
            ("not-an-email", "secret123"),
        ] {
            let err = auth.login(email, password).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn test_unknown_email_still_runs_argon2() {
        let (store, hasher, tokens) = fixtures();
        let auth = AuthService::new(&store, &hasher, &tokens);
        assert!(hasher.dummy_digest.get().is_none());

        let err = auth.login("nobody@x.com", "secret123").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(hasher.dummy_digest.get().is_some());
    }

    #[tokio::test]
    async fn test_short_password_is_rejected() {
        let (store, hasher, tokens) = fixtures();
        let auth = AuthService::new(&store, &hasher, &tokens);

        let err = auth.register("a@x.com", "alice", "short").await.unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));
    }

    #[tokio::test]
    async fn test_update_changes_password_and_checks_others() {
        let (store, hasher, tokens) = fixtures();
        let auth = AuthService::new(&store, &hasher, &tokens);
        let alice = auth.register("a@x.com", "alice", "secret123").await.unwrap();
        auth.register("b@x.com", "bob", "secret123").await.unwrap();

        let err = auth
            .update(
                alice.id,
                UserUpdate {
                    username: Some("bob".to_owned()),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyTaken(ref f) if f == "username"));

        let updated = auth
            .update(
                alice.id,
                UserUpdate {
                    email: Some("a@x.com".to_owned()),
                    password: Some("new-secret-456".to_owned()),
                    bio: Some(Some("hi".to_owned())),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.bio.as_deref(), Some("hi"));

        assert!(auth.login("a@x.com", "secret123").await.is_err());
        assert!(auth.login("a@x.com", "new-secret-456").await.is_ok());
    }
}
