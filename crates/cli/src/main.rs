//! Conduit CLI - database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending database migrations
//! conduit-cli migrate
//!
//! # Register a user and print a token for it
//! conduit-cli user create -e jake@jake.jake -u jake -p 'correct horse battery'
//!
//! # Sign a token for an existing user ID
//! conduit-cli token issue -u 42
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Register a user
//! - `token issue` - Sign a bearer token

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use conduit_core::UserId;

mod commands;

#[derive(Parser)]
#[command(name = "conduit-cli")]
#[command(author, version, about = "Conduit CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage bearer tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Username
        #[arg(short, long)]
        username: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a token for a user ID
    Issue {
        /// User ID the token is issued to
        #[arg(short, long)]
        user_id: UserId,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                username,
                password,
            } => commands::user::create(&email, &username, &password).await?,
        },
        Commands::Token { action } => match action {
            TokenAction::Issue { user_id } => commands::token::issue(user_id)?,
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_token_issue() {
        let cli = Cli::try_parse_from(["conduit-cli", "token", "issue", "-u", "42"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Token { action: TokenAction::Issue { user_id } } if user_id.as_i64() == 42
        ));
    }

    #[test]
    fn test_rejects_non_numeric_user_id() {
        assert!(Cli::try_parse_from(["conduit-cli", "token", "issue", "-u", "jake"]).is_err());
    }
}
