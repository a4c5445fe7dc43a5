//! Comment domain types.

use chrono::{DateTime, Utc};

use conduit_core::{ArticleId, CommentId, UserId};

use super::Profile;

/// A comment on an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub article_id: ArticleId,
    pub author_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub article_id: ArticleId,
    pub author_id: UserId,
    pub body: String,
}

/// A comment as presented to a particular viewer.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: Comment,
    pub author: Profile,
}
