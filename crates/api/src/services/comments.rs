//! Article comments.

use conduit_core::CommentId;

use super::articles::ArticleService;
use super::profiles::profiles_for;
use super::ContentError;
use crate::db::{RepositoryError, Stores};
use crate::models::{Comment, CommentView, NewComment, User};

/// Comment operations relative to a viewer.
pub struct CommentService<'a> {
    stores: &'a Stores,
}

impl<'a> CommentService<'a> {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(stores: &'a Stores) -> Self {
        Self { stores }
    }

    /// Comment on the article at `slug`.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::ArticleNotFound` for an unknown slug and
    /// `ContentError::Invalid` for a blank body.
    pub async fn add(
        &self,
        viewer: &User,
        slug: &str,
        body: &str,
    ) -> Result<CommentView, ContentError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ContentError::Invalid("body can't be blank".to_owned()));
        }
        let article = ArticleService::new(self.stores).find(slug).await?;

        let comment = self
            .stores
            .comments
            .create(NewComment {
                article_id: article.id,
                author_id: viewer.id,
                body: body.to_owned(),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ContentError::ArticleNotFound,
                other => other.into(),
            })?;

        Ok(CommentView {
            author: viewer.profile(false),
            comment,
        })
    }

    /// All comments on the article at `slug`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::ArticleNotFound` for an unknown slug.
    pub async fn list(
        &self,
        viewer: Option<&User>,
        slug: &str,
    ) -> Result<Vec<CommentView>, ContentError> {
        let article = ArticleService::new(self.stores).find(slug).await?;
        let comments = self.stores.comments.list_for_article(article.id).await?;
        self.views(viewer, comments).await
    }

    /// Delete comment `id` from the article at `slug`.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::CommentNotFound` if the comment does not exist
    /// or belongs to another article, and `ContentError::NotAuthor` unless
    /// `viewer` wrote it.
    pub async fn delete(
        &self,
        viewer: &User,
        slug: &str,
        id: CommentId,
    ) -> Result<(), ContentError> {
        let article = ArticleService::new(self.stores).find(slug).await?;
        let comment = self
            .stores
            .comments
            .find_by_id(id)
            .await?
            .filter(|c| c.article_id == article.id)
            .ok_or(ContentError::CommentNotFound)?;

        if comment.author_id != viewer.id {
            return Err(ContentError::NotAuthor);
        }

        self.stores.comments.delete(comment.id).await?;
        Ok(())
    }

    async fn views(
        &self,
        viewer: Option<&User>,
        comments: Vec<Comment>,
    ) -> Result<Vec<CommentView>, ContentError> {
        let authors: Vec<_> = comments.iter().map(|c| c.author_id).collect();
        let profiles = profiles_for(self.stores, viewer, &authors).await?;

        comments
            .into_iter()
            .map(|comment| {
                let author = profiles.get(&comment.author_id).cloned().ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "comment {} has no author",
                        comment.id
                    ))
                })?;
                Ok(CommentView { comment, author })
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use conduit_core::{Email, Username};

    use super::*;
    use crate::services::ArticleInput;
    use crate::models::NewUser;

    async fn register(stores: &Stores, email: &str, username: &str) -> User {
        stores
            .users
            .create(NewUser {
                email: Email::parse(email).unwrap(),
                username: Username::parse(username).unwrap(),
                password_hash: "hash".to_owned(),
            })
            .await
            .unwrap()
    }

    async fn publish(stores: &Stores, author: &User, title: &str) -> String {
        ArticleService::new(stores)
            .create(
                author,
                ArticleInput {
                    title: title.to_owned(),
                    description: "d".to_owned(),
                    body: "b".to_owned(),
                    tags: Vec::new(),
                },
            )
            .await
            .unwrap()
            .article
            .slug
            .as_str()
            .to_owned()
    }

    #[tokio::test]
    async fn test_comments_listed_oldest_first() {
        let stores = Stores::in_memory();
        let alice = register(&stores, "a@x.com", "alice").await;
        let bob = register(&stores, "b@x.com", "bob").await;
        let slug = publish(&stores, &alice, "Post").await;
        let comments = CommentService::new(&stores);

        comments.add(&bob, &slug, "first").await.unwrap();
        comments.add(&alice, &slug, "second").await.unwrap();

        let listed = comments.list(None, &slug).await.unwrap();
        let bodies: Vec<_> = listed.iter().map(|c| c.comment.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert_eq!(listed[0].author.username.as_str(), "bob");
    }

    #[tokio::test]
    async fn test_only_comment_author_may_delete() {
        let stores = Stores::in_memory();
        let alice = register(&stores, "a@x.com", "alice").await;
        let bob = register(&stores, "b@x.com", "bob").await;
        let slug = publish(&stores, &alice, "Post").await;
        let comments = CommentService::new(&stores);
        let view = comments.add(&bob, &slug, "mine").await.unwrap();

        assert!(matches!(
            comments.delete(&alice, &slug, view.comment.id).await,
            Err(ContentError::NotAuthor)
        ));
        comments.delete(&bob, &slug, view.comment.id).await.unwrap();
        assert!(comments.list(None, &slug).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comment_must_belong_to_article() {
        let stores = Stores::in_memory();
        let alice = register(&stores, "a@x.com", "alice").await;
        let first = publish(&stores, &alice, "First").await;
        let second = publish(&stores, &alice, "Second").await;
        let comments = CommentService::new(&stores);
        let view = comments.add(&alice, &first, "hello").await.unwrap();

        assert!(matches!(
            comments.delete(&alice, &second, view.comment.id).await,
            Err(ContentError::CommentNotFound)
        ));
    }

    #[tokio::test]
    async fn test_deleting_article_removes_comments() {
        let stores = Stores::in_memory();
        let alice = register(&stores, "a@x.com", "alice").await;
        let slug = publish(&stores, &alice, "Doomed").await;
        let comments = CommentService::new(&stores);
        let view = comments.add(&alice, &slug, "bye").await.unwrap();

        ArticleService::new(&stores).delete(&alice, &slug).await.unwrap();
        assert!(stores.comments.find_by_id(view.comment.id).await.unwrap().is_none());
    }
}
