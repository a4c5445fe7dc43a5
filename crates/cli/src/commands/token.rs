//! Token commands.
//!
//! # Usage
//!
//! ```bash
//! conduit-cli token issue -u 42
//! ```
//!
//! Signs a token offline with `CONDUIT_JWT_SECRET`; no database access. The
//! token is only useful if user `42` exists on the server verifying it.

use chrono::Utc;
use conduit_api::config::{ConfigError, TokenConfig};
use conduit_api::services::{TokenError, TokenService};
use conduit_core::UserId;
use thiserror::Error;

/// Errors that can occur while issuing a token.
#[derive(Debug, Error)]
pub enum TokenCommandError {
    /// Missing or invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Signing failed or the settings were rejected.
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Issue a token for `user_id` and print it with its expiry.
///
/// # Errors
///
/// Returns `TokenCommandError` if the secret is missing or weak.
pub fn issue(user_id: UserId) -> Result<(), TokenCommandError> {
    let tokens = TokenService::new(&TokenConfig::from_env()?)?;

    let now = Utc::now();
    let token = tokens.issue(user_id, now)?;
    let expires_at = now + tokens.lifetime();

    tracing::info!(%user_id, %expires_at, "Token issued");

    #[allow(clippy::print_stdout)]
    {
        println!("{token}");
    }

    Ok(())
}
