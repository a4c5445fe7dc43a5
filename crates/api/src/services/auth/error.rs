//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::TokenError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] conduit_core::EmailError),

    /// Invalid username format.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] conduit_core::UsernameError),

    /// Invalid credentials (wrong password or user not found).
    #[error("email or password is invalid")]
    InvalidCredentials,

    /// Email or username already belongs to another user.
    #[error("{0} has already been taken")]
    AlreadyTaken(String),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token could not be issued.
    #[error("token error: {0}")]
    Token(#[from] TokenError),
}
