//! Articles, favourites, the feed and tags.

use conduit_core::{Page, Slug, Username};

use super::ContentError;
use super::profiles::profiles_for;
use crate::db::{RepositoryError, Stores};
use crate::models::article::normalize_tags;
use crate::models::{Article, ArticleChanges, ArticleFilter, ArticleView, NewArticle, User};

/// Attempts at drawing a fresh slug suffix before giving up.
const SLUG_ATTEMPTS: usize = 3;

/// Fields of a new article.
#[derive(Debug, Clone, Default)]
pub struct ArticleInput {
    pub title: String,
    pub description: String,
    pub body: String,
    pub tags: Vec<String>,
}

/// Partial article update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
}

/// Listing filters as sent by clients (names, not IDs).
#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub tag: Option<String>,
    pub author: Option<String>,
    pub favorited: Option<String>,
}

/// Article operations relative to a viewer.
pub struct ArticleService<'a> {
    stores: &'a Stores,
}

impl<'a> ArticleService<'a> {
    /// Create a new article service.
    #[must_use]
    pub const fn new(stores: &'a Stores) -> Self {
        Self { stores }
    }

    /// Publish an article by `author`.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Invalid` if title, description or body is blank.
    pub async fn create(
        &self,
        author: &User,
        input: ArticleInput,
    ) -> Result<ArticleView, ContentError> {
        let title = required("title", input.title)?;
        let description = required("description", input.description)?;
        let body = required("body", input.body)?;
        let tags = normalize_tags(input.tags);

        let articles = &self.stores.articles;
        let (title_ref, description, body, author_id) = (&title, &description, &body, author.id);
        let article = with_fresh_slug(&title, move |slug| {
            articles.create(NewArticle {
                slug,
                title: title_ref.clone(),
                description: description.clone(),
                body: body.clone(),
                tags: tags.clone(),
                author_id,
            })
        })
        .await?;

        tracing::info!(article_id = %article.id, slug = %article.slug, "article created");
        self.view(Some(author), article).await
    }

    /// One article by slug.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::ArticleNotFound` for an unknown slug.
    pub async fn get(&self, viewer: Option<&User>, slug: &str) -> Result<ArticleView, ContentError> {
        let article = self.find(slug).await?;
        self.view(viewer, article).await
    }

    /// Update an article. Changing the title regenerates the slug.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NotAuthor` unless `viewer` wrote the article.
    pub async fn update(
        &self,
        viewer: &User,
        slug: &str,
        update: ArticleUpdate,
    ) -> Result<ArticleView, ContentError> {
        let article = self.find(slug).await?;
        if article.author_id != viewer.id {
            return Err(ContentError::NotAuthor);
        }

        let title = update.title.map(|t| required("title", t)).transpose()?;
        let description = update
            .description
            .map(|d| required("description", d))
            .transpose()?;
        let body = update.body.map(|b| required("body", b)).transpose()?;

        let articles = &self.stores.articles;
        let id = article.id;
        let updated = match title {
            Some(title) => {
                let (title_ref, description, body) = (&title, &description, &body);
                with_fresh_slug(&title, move |slug| {
                    articles.update(
                        id,
                        ArticleChanges {
                            title: Some((title_ref.clone(), slug)),
                            description: description.clone(),
                            body: body.clone(),
                        },
                    )
                })
                .await?
            }
            None => {
                let changes = ArticleChanges {
                    title: None,
                    description,
                    body,
                };
                if changes.is_empty() {
                    article
                } else {
                    articles.update(id, changes).await?
                }
            }
        };
        self.view(Some(viewer), updated).await
    }

    /// Delete an article with its comments and favourites.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NotAuthor` unless `viewer` wrote the article.
    pub async fn delete(&self, viewer: &User, slug: &str) -> Result<(), ContentError> {
        let article = self.find(slug).await?;
        if article.author_id != viewer.id {
            return Err(ContentError::NotAuthor);
        }

        if !self.stores.articles.delete(article.id).await? {
            return Err(ContentError::ArticleNotFound);
        }
        tracing::info!(article_id = %article.id, "article deleted");
        Ok(())
    }

    /// Newest-first listing with the total number of matches.
    ///
    /// An unknown author or favouriting user matches nothing.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Repository` if the store fails.
    pub async fn list(
        &self,
        viewer: Option<&User>,
        query: ArticleQuery,
        page: Page,
    ) -> Result<(Vec<ArticleView>, u64), ContentError> {
        let mut filter = ArticleFilter {
            tag: query.tag,
            ..ArticleFilter::default()
        };

        if let Some(author) = query.author {
            match self.user_named(&author).await? {
                Some(user) => filter.author = Some(user.id),
                None => return Ok((Vec::new(), 0)),
            }
        }
        if let Some(favorited) = query.favorited {
            match self.user_named(&favorited).await? {
                Some(user) => filter.favourited_by = Some(user.id),
                None => return Ok((Vec::new(), 0)),
            }
        }

        let (articles, total) = self.stores.articles.list(&filter, page).await?;
        Ok((self.views(viewer, articles).await?, total))
    }

    /// Articles by authors `viewer` follows, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Repository` if the store fails.
    pub async fn feed(
        &self,
        viewer: &User,
        page: Page,
    ) -> Result<(Vec<ArticleView>, u64), ContentError> {
        let followees = self.stores.follows.followees(viewer.id).await?;
        if followees.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let filter = ArticleFilter {
            authors: Some(followees),
            ..ArticleFilter::default()
        };
        let (articles, total) = self.stores.articles.list(&filter, page).await?;
        Ok((self.views(Some(viewer), articles).await?, total))
    }

    /// Mark an article as a favourite of `viewer`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::ArticleNotFound` for an unknown slug.
    pub async fn favourite(&self, viewer: &User, slug: &str) -> Result<ArticleView, ContentError> {
        let article = self.find(slug).await?;
        self.stores.favourites.favourite(viewer.id, article.id).await?;
        self.view(Some(viewer), article).await
    }

    /// Remove an article from `viewer`'s favourites. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::ArticleNotFound` for an unknown slug.
    pub async fn unfavourite(
        &self,
        viewer: &User,
        slug: &str,
    ) -> Result<ArticleView, ContentError> {
        let article = self.find(slug).await?;
        self.stores
            .favourites
            .unfavourite(viewer.id, article.id)
            .await?;
        self.view(Some(viewer), article).await
    }

    /// Every tag in use, sorted.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Repository` if the store fails.
    pub async fn tags(&self) -> Result<Vec<String>, ContentError> {
        Ok(self.stores.articles.tags().await?)
    }

    pub(crate) async fn find(&self, slug: &str) -> Result<Article, ContentError> {
        self.stores
            .articles
            .find_by_slug(slug)
            .await?
            .ok_or(ContentError::ArticleNotFound)
    }

    async fn user_named(&self, name: &str) -> Result<Option<User>, ContentError> {
        let Ok(username) = Username::parse(name) else {
            return Ok(None);
        };
        Ok(self.stores.users.find_by_username(&username).await?)
    }

    async fn view(&self, viewer: Option<&User>, article: Article) -> Result<ArticleView, ContentError> {
        self.views(viewer, vec![article])
            .await?
            .pop()
            .ok_or(ContentError::ArticleNotFound)
    }

    /// Attach author profiles, favourite flags and counts in one batch.
    async fn views(
        &self,
        viewer: Option<&User>,
        articles: Vec<Article>,
    ) -> Result<Vec<ArticleView>, ContentError> {
        if articles.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<_> = articles.iter().map(|a| a.id).collect();
        let authors: Vec<_> = articles.iter().map(|a| a.author_id).collect();

        let profiles = profiles_for(self.stores, viewer, &authors).await?;
        let counts = self.stores.favourites.counts(&ids).await?;
        let favourited = match viewer {
            Some(viewer) => {
                self.stores
                    .favourites
                    .favourited_among(viewer.id, &ids)
                    .await?
            }
            None => Default::default(),
        };

        articles
            .into_iter()
            .map(|article| {
                let author = profiles.get(&article.author_id).cloned().ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "article {} has no author",
                        article.id
                    ))
                })?;
                Ok(ArticleView {
                    favourited: favourited.contains(&article.id),
                    favourites_count: counts.get(&article.id).copied().unwrap_or(0),
                    author,
                    article,
                })
            })
            .collect()
    }
}

/// Run `write` with a freshly suffixed slug for `title`, drawing a new
/// suffix on each slug collision. Still colliding after `SLUG_ATTEMPTS` is
/// `ContentError::Conflict`.
async fn with_fresh_slug<T, F, Fut>(title: &str, mut write: F) -> Result<T, ContentError>
where
    F: FnMut(Slug) -> Fut,
    Fut: Future<Output = Result<T, RepositoryError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match write(Slug::from_title(title, rand::random::<u32>())).await {
            Err(RepositoryError::Conflict(field)) if attempt < SLUG_ATTEMPTS => {
                tracing::debug!(attempt, %field, "slug collision, retrying");
            }
            Err(RepositoryError::Conflict(field)) => return Err(ContentError::Conflict(field)),
            other => return Ok(other?),
        }
    }
}

fn required(field: &str, value: String) -> Result<String, ContentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ContentError::Invalid(format!("{field} can't be blank")));
    }
    if trimmed.len() == value.len() {
        Ok(value)
    } else {
        Ok(trimmed.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use conduit_core::{ArticleId, Email};

    use super::*;
    use crate::db::ArticleStore;
    use crate::models::NewUser;

    /// Article store whose next `collisions` writes report a taken slug.
    struct CollidingArticles {
        inner: Arc<dyn ArticleStore>,
        collisions: AtomicUsize,
    }

    impl CollidingArticles {
        fn collide(&self) -> Result<(), RepositoryError> {
            match self
                .collisions
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            {
                Ok(_) => Err(RepositoryError::Conflict("slug".to_owned())),
                Err(_) => Ok(()),
            }
        }
    }

    #[async_trait]
    impl ArticleStore for CollidingArticles {
        async fn create(&self, article: NewArticle) -> Result<Article, RepositoryError> {
            self.collide()?;
            self.inner.create(article).await
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<Article>, RepositoryError> {
            self.inner.find_by_slug(slug).await
        }

        async fn update(
            &self,
            id: ArticleId,
            changes: ArticleChanges,
        ) -> Result<Article, RepositoryError> {
            self.collide()?;
            self.inner.update(id, changes).await
        }

        async fn delete(&self, id: ArticleId) -> Result<bool, RepositoryError> {
            self.inner.delete(id).await
        }

        async fn list(
            &self,
            filter: &ArticleFilter,
            page: Page,
        ) -> Result<(Vec<Article>, u64), RepositoryError> {
            self.inner.list(filter, page).await
        }

        async fn tags(&self) -> Result<Vec<String>, RepositoryError> {
            self.inner.tags().await
        }
    }

    fn with_collisions(stores: &mut Stores) -> Arc<CollidingArticles> {
        let colliding = Arc::new(CollidingArticles {
            inner: stores.articles.clone(),
            collisions: AtomicUsize::new(0),
        });
        stores.articles = colliding.clone();
        colliding
    }

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

    fn input(title: &str, tags: &[&str]) -> ArticleInput {
        ArticleInput {
            title: title.to_owned(),
            description: "about".to_owned(),
            body: "words".to_owned(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_derives_slug_and_normalizes_tags() {
        let stores = Stores::in_memory();
        let alice = register(&stores, "a@x.com", "alice").await;
        let articles = ArticleService::new(&stores);

        let view = articles
            .create(&alice, input("How to Train Your Dragon", &["dragons", " dragons", "training"]))
            .await
            .unwrap();

        assert!(view.article.slug.as_str().starts_with("how-to-train-your-dragon-"));
        assert_eq!(view.article.tags, vec!["dragons", "training"]);
        assert_eq!(view.author.username.as_str(), "alice");
        assert!(!view.favourited);
        assert_eq!(view.favourites_count, 0);
    }

    #[tokio::test]
    async fn test_blank_fields_are_rejected() {
        let stores = Stores::in_memory();
        let alice = register(&stores, "a@x.com", "alice").await;
        let articles = ArticleService::new(&stores);

        let err = articles.create(&alice, input("   ", &[])).await.unwrap_err();
        assert!(matches!(err, ContentError::Invalid(ref m) if m.contains("title")));
    }

    #[tokio::test]
    async fn test_only_author_may_update_or_delete() {
        let stores = Stores::in_memory();
        let alice = register(&stores, "a@x.com", "alice").await;
        let bob = register(&stores, "b@x.com", "bob").await;
        let articles = ArticleService::new(&stores);
        let slug = articles
            .create(&alice, input("Mine", &[]))
            .await
            .unwrap()
            .article
            .slug;

        let update = ArticleUpdate {
            body: Some("hijacked".to_owned()),
            ..ArticleUpdate::default()
        };
        assert!(matches!(
            articles.update(&bob, slug.as_str(), update).await,
            Err(ContentError::NotAuthor)
        ));
        assert!(matches!(
            articles.delete(&bob, slug.as_str()).await,
            Err(ContentError::NotAuthor)
        ));

        articles.delete(&alice, slug.as_str()).await.unwrap();
        assert!(matches!(
            articles.get(None, slug.as_str()).await,
            Err(ContentError::ArticleNotFound)
        ));
    }

    #[tokio::test]
    async fn test_title_change_regenerates_slug() {
        let stores = Stores::in_memory();
        let alice = register(&stores, "a@x.com", "alice").await;
        let articles = ArticleService::new(&stores);
        let original = articles.create(&alice, input("Old Title", &[])).await.unwrap();

        let update = ArticleUpdate {
            title: Some("New Title".to_owned()),
            ..ArticleUpdate::default()
        };
        let updated = articles
            .update(&alice, original.article.slug.as_str(), update)
            .await
            .unwrap();

        assert!(updated.article.slug.as_str().starts_with("new-title-"));
        assert!(updated.article.updated_at >= original.article.updated_at);
        assert!(articles.get(None, original.article.slug.as_str()).await.is_err());
    }

    #[tokio::test]
    async fn test_favourite_counts_once() {
        let stores = Stores::in_memory();
        let alice = register(&stores, "a@x.com", "alice").await;
        let bob = register(&stores, "b@x.com", "bob").await;
        let articles = ArticleService::new(&stores);
        let slug = articles.create(&alice, input("Fave", &[])).await.unwrap().article.slug;

        articles.favourite(&bob, slug.as_str()).await.unwrap();
        let view = articles.favourite(&bob, slug.as_str()).await.unwrap();
        assert!(view.favourited);
        assert_eq!(view.favourites_count, 1);

        let seen_by_alice = articles.get(Some(&alice), slug.as_str()).await.unwrap();
        assert!(!seen_by_alice.favourited);
        assert_eq!(seen_by_alice.favourites_count, 1);

        let view = articles.unfavourite(&bob, slug.as_str()).await.unwrap();
        assert!(!view.favourited);
        assert_eq!(view.favourites_count, 0);
    }

    #[tokio::test]
    async fn test_list_filters_by_names() {
        let stores = Stores::in_memory();
        let alice = register(&stores, "a@x.com", "alice").await;
        let bob = register(&stores, "b@x.com", "bob").await;
        let articles = ArticleService::new(&stores);
        articles.create(&alice, input("A1", &["rust"])).await.unwrap();
        let b1 = articles.create(&bob, input("B1", &["go"])).await.unwrap();
        articles.favourite(&alice, b1.article.slug.as_str()).await.unwrap();

        let by_author = ArticleQuery {
            author: Some("alice".to_owned()),
            ..ArticleQuery::default()
        };
        let (views, total) = articles.list(None, by_author, Page::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(views[0].article.title, "A1");

        let by_favourite = ArticleQuery {
            favorited: Some("alice".to_owned()),
            ..ArticleQuery::default()
        };
        let (views, _) = articles.list(Some(&alice), by_favourite, Page::default()).await.unwrap();
        assert_eq!(views.len(), 1);
        assert!(views[0].favourited);

        let unknown = ArticleQuery {
            author: Some("ghost".to_owned()),
            ..ArticleQuery::default()
        };
        let (views, total) = articles.list(None, unknown, Page::default()).await.unwrap();
        assert!(views.is_empty());
        assert_eq!(total, 0);

        assert_eq!(articles.tags().await.unwrap(), vec!["go", "rust"]);
    }

    #[tokio::test]
    async fn test_feed_lists_only_followed_authors() {
        let stores = Stores::in_memory();
        let alice = register(&stores, "a@x.com", "alice").await;
        let bob = register(&stores, "b@x.com", "bob").await;
        let carol = register(&stores, "c@x.com", "carol").await;
        let articles = ArticleService::new(&stores);
        articles.create(&bob, input("From Bob", &[])).await.unwrap();
        articles.create(&carol, input("From Carol", &[])).await.unwrap();

        let (empty, _) = articles.feed(&alice, Page::default()).await.unwrap();
        assert!(empty.is_empty());

        stores.follows.follow(alice.id, bob.id).await.unwrap();
        let (views, total) = articles.feed(&alice, Page::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(views[0].article.title, "From Bob");
        assert!(views[0].author.following);
    }

    #[tokio::test]
    async fn test_create_retries_slug_collisions() {
        let mut stores = Stores::in_memory();
        let colliding = with_collisions(&mut stores);
        let alice = register(&stores, "a@x.com", "alice").await;
        let articles = ArticleService::new(&stores);

        colliding.collisions.store(SLUG_ATTEMPTS - 1, Ordering::SeqCst);
        let view = articles.create(&alice, input("Busy Title", &[])).await.unwrap();
        assert!(view.article.slug.as_str().starts_with("busy-title-"));

        colliding.collisions.store(SLUG_ATTEMPTS, Ordering::SeqCst);
        let err = articles.create(&alice, input("Busy Title", &[])).await.unwrap_err();
        assert!(matches!(err, ContentError::Conflict(ref field) if field == "slug"));
    }

    #[tokio::test]
    async fn test_title_change_retries_slug_collisions() {
        let mut stores = Stores::in_memory();
        let colliding = with_collisions(&mut stores);
        let alice = register(&stores, "a@x.com", "alice").await;
        let articles = ArticleService::new(&stores);
        let slug = articles
            .create(&alice, input("Old Title", &[]))
            .await
            .unwrap()
            .article
            .slug;

        let retitle = |title: &str| ArticleUpdate {
            title: Some(title.to_owned()),
            ..ArticleUpdate::default()
        };

        colliding.collisions.store(SLUG_ATTEMPTS - 1, Ordering::SeqCst);
        let renamed = articles
            .update(&alice, slug.as_str(), retitle("New Title"))
            .await
            .unwrap();
        assert!(renamed.article.slug.as_str().starts_with("new-title-"));

        colliding.collisions.store(SLUG_ATTEMPTS, Ordering::SeqCst);
        let err = articles
            .update(&alice, renamed.article.slug.as_str(), retitle("Newer Title"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Conflict(_)));
        assert_eq!(
            articles
                .get(None, renamed.article.slug.as_str())
                .await
                .unwrap()
                .article
                .title,
            "New Title"
        );
    }
}
