//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! conduit-cli user create -e jake@jake.jake -u jake -p 'correct horse battery'
//! ```
//!
//! Creates the account through the same registration path as
//! `POST /api/users`, then prints the new user's ID and a bearer token.
//!
//! # Environment Variables
//!
//! - `CONDUIT_DATABASE_URL` - `PostgreSQL` connection string
//! - `CONDUIT_JWT_SECRET` - token signing secret
//! - `CONDUIT_SESSION_TIME` - token lifetime in seconds (optional)

use conduit_api::config::{self, ConfigError, TokenConfig};
use conduit_api::db::{self, Stores};
use conduit_api::services::{AuthError, TokenError};
use conduit_api::state::AppState;
use thiserror::Error;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserCommandError {
    /// Missing or invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Token settings rejected.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Registration failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Register a user and print its ID and a fresh token.
///
/// # Errors
///
/// Returns `UserCommandError` if configuration is missing, the database is
/// unreachable, or registration is rejected.
pub async fn create(email: &str, username: &str, password: &str) -> Result<(), UserCommandError> {
    let token_config = TokenConfig::from_env()?;
    let database_url = config::database_url_from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;
    let state = AppState::new(&token_config, Stores::postgres(pool))?;

    tracing::info!(%username, "Creating user");
    let auth = state.auth();
    let user = auth.register(email, username, password).await?;
    let token = auth.issue_token(&user)?;

    tracing::info!(user_id = %user.id, "User created");

    #[allow(clippy::print_stdout)]
    {
        println!("id:    {}", user.id);
        println!("token: {token}");
    }

    Ok(())
}
