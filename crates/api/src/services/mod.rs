//! Business logic services for Conduit.
//!
//! # Services
//!
//! - `token` - bearer token issue and verification
//! - `auth` - registration, login, account updates, password hashing
//! - `identity` - per-request resolution of the current user
//! - `profiles` - public profiles and follow relations
//! - `articles` - articles, favourites, feed and tags
//! - `comments` - article comments
//!
//! Services borrow their collaborators from [`crate::state::AppState`]; they
//! hold no state of their own.

pub mod articles;
pub mod auth;
pub mod comments;
pub mod identity;
pub mod profiles;
pub mod token;

mod error;

pub use articles::{ArticleInput, ArticleQuery, ArticleService, ArticleUpdate};
pub use auth::{AuthError, AuthService, PasswordHasher, UserUpdate};
pub use comments::CommentService;
pub use error::ContentError;
pub use identity::{AuthContext, IdentityResolver, Principal};
pub use profiles::ProfileService;
pub use token::{TokenError, TokenService};
