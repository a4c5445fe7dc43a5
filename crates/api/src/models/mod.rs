//! Domain models for Conduit.
//!
//! These are validated domain objects, separate from database rows and from
//! the JSON shapes in [`crate::routes`].

pub mod article;
pub mod comment;
pub mod user;

pub use article::{Article, ArticleChanges, ArticleFilter, ArticleView, NewArticle};
pub use comment::{Comment, CommentView, NewComment};
pub use user::{NewUser, Profile, User, UserChanges};
