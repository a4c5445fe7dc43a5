//! Errors shared by the content services.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors from profile, article and comment operations.
#[derive(Debug, Error)]
pub enum ContentError {
    /// No article with the requested slug.
    #[error("article not found")]
    ArticleNotFound,

    /// No such comment on the requested article.
    #[error("comment not found")]
    CommentNotFound,

    /// No user with the requested username.
    #[error("profile not found")]
    ProfileNotFound,

    /// The caller is not the author of the resource.
    #[error("only the author may modify this resource")]
    NotAuthor,

    /// A unique value (an article slug) is already in use.
    #[error("{0} has already been taken")]
    Conflict(String),

    /// Input failed validation.
    #[error("{0}")]
    Invalid(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
