//! In-process store implementing every store trait.
//!
//! Backs the integration tests and local experiments. Enforces the same
//! uniqueness rules and cascades as the `PostgreSQL` schema.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use conduit_core::{ArticleId, CommentId, Email, Page, UserId, Username};

use super::{ArticleStore, CommentStore, FavouriteStore, FollowStore, RepositoryError, UserStore};
use crate::models::{
    Article, ArticleChanges, ArticleFilter, Comment, NewArticle, NewComment, NewUser, User,
    UserChanges,
};

#[derive(Default)]
struct MemoryState {
    next_user: i64,
    next_article: i64,
    next_comment: i64,
    users: BTreeMap<UserId, (User, String)>,
    articles: BTreeMap<ArticleId, Article>,
    comments: BTreeMap<CommentId, Comment>,
    follows: HashSet<(UserId, UserId)>,
    favourites: HashSet<(UserId, ArticleId)>,
}

impl MemoryState {
    fn email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|(u, _)| &u.email == email && Some(u.id) != except)
    }

    fn username_taken(&self, username: &Username, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|(u, _)| &u.username == username && Some(u.id) != except)
    }

    fn slug_taken(&self, slug: &str, except: Option<ArticleId>) -> bool {
        self.articles
            .values()
            .any(|a| a.slug.as_str() == slug && Some(a.id) != except)
    }

    fn matches(&self, article: &Article, filter: &ArticleFilter) -> bool {
        filter
            .tag
            .as_ref()
            .is_none_or(|tag| article.tags.contains(tag))
            && filter.author.is_none_or(|author| article.author_id == author)
            && filter
                .favourited_by
                .is_none_or(|user| self.favourites.contains(&(user, article.id)))
            && filter
                .authors
                .as_ref()
                .is_none_or(|authors| authors.contains(&article.author_id))
    }
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.read().users.get(&id).map(|(u, _)| u.clone()))
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        let state = self.read();
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).map(|(u, _)| u.clone()))
            .collect())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .read()
            .users
            .values()
            .find(|(u, _)| &u.email == email)
            .map(|(u, _)| u.clone()))
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .read()
            .users
            .values()
            .find(|(u, _)| &u.username == username)
            .map(|(u, _)| u.clone()))
    }

    async fn find_credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .read()
            .users
            .values()
            .find(|(u, _)| &u.email == email)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut state = self.write();
        if state.email_taken(&user.email, None) {
            return Err(RepositoryError::Conflict("email".to_owned()));
        }
        if state.username_taken(&user.username, None) {
            return Err(RepositoryError::Conflict("username".to_owned()));
        }

        state.next_user += 1;
        let now = Utc::now();
        let created = User {
            id: UserId::new(state.next_user),
            email: user.email,
            username: user.username,
            bio: None,
            image: None,
            created_at: now,
            updated_at: now,
        };
        state
            .users
            .insert(created.id, (created.clone(), user.password_hash));
        Ok(created)
    }

    async fn update(&self, id: UserId, changes: UserChanges) -> Result<User, RepositoryError> {
        let mut state = self.write();
        if let Some(email) = &changes.email
            && state.email_taken(email, Some(id))
        {
            return Err(RepositoryError::Conflict("email".to_owned()));
        }
        if let Some(username) = &changes.username
            && state.username_taken(username, Some(id))
        {
            return Err(RepositoryError::Conflict("username".to_owned()));
        }

        let (user, hash) = state.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if let Some(new_hash) = changes.password_hash.clone() {
            *hash = new_hash;
        }
        changes.apply(user, Utc::now());
        Ok(user.clone())
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn create(&self, article: NewArticle) -> Result<Article, RepositoryError> {
        let mut state = self.write();
        if state.slug_taken(article.slug.as_str(), None) {
            return Err(RepositoryError::Conflict("slug".to_owned()));
        }

        state.next_article += 1;
        let now = Utc::now();
        let created = Article {
            id: ArticleId::new(state.next_article),
            slug: article.slug,
            title: article.title,
            description: article.description,
            body: article.body,
            tags: article.tags,
            author_id: article.author_id,
            created_at: now,
            updated_at: now,
        };
        state.articles.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Article>, RepositoryError> {
        Ok(self
            .read()
            .articles
            .values()
            .find(|a| a.slug.as_str() == slug)
            .cloned())
    }

    async fn update(
        &self,
        id: ArticleId,
        changes: ArticleChanges,
    ) -> Result<Article, RepositoryError> {
        let mut state = self.write();
        if let Some((_, slug)) = &changes.title
            && state.slug_taken(slug.as_str(), Some(id))
        {
            return Err(RepositoryError::Conflict("slug".to_owned()));
        }

        let article = state.articles.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        changes.apply(article, Utc::now());
        Ok(article.clone())
    }

    async fn delete(&self, id: ArticleId) -> Result<bool, RepositoryError> {
        let mut state = self.write();
        if state.articles.remove(&id).is_none() {
            return Ok(false);
        }
        state.comments.retain(|_, c| c.article_id != id);
        state.favourites.retain(|(_, article)| *article != id);
        Ok(true)
    }

    async fn list(
        &self,
        filter: &ArticleFilter,
        page: Page,
    ) -> Result<(Vec<Article>, u64), RepositoryError> {
        let state = self.read();
        let mut matching: Vec<&Article> = state
            .articles
            .values()
            .filter(|a| state.matches(a, filter))
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = u64::try_from(matching.len()).unwrap_or(u64::MAX);
        let window = page.slice(&matching).iter().map(|a| (*a).clone()).collect();
        Ok((window, total))
    }

    async fn tags(&self) -> Result<Vec<String>, RepositoryError> {
        let state = self.read();
        let mut tags: Vec<String> = state
            .articles
            .values()
            .flat_map(|a| a.tags.iter().cloned())
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create(&self, comment: NewComment) -> Result<Comment, RepositoryError> {
        let mut state = self.write();
        if !state.articles.contains_key(&comment.article_id) {
            return Err(RepositoryError::NotFound);
        }

        state.next_comment += 1;
        let now = Utc::now();
        let created = Comment {
            id: CommentId::new(state.next_comment),
            article_id: comment.article_id,
            author_id: comment.author_id,
            body: comment.body,
            created_at: now,
            updated_at: now,
        };
        state.comments.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: CommentId) -> Result<Option<Comment>, RepositoryError> {
        Ok(self.read().comments.get(&id).cloned())
    }

    async fn list_for_article(
        &self,
        article: ArticleId,
    ) -> Result<Vec<Comment>, RepositoryError> {
        let state = self.read();
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.article_id == article)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn delete(&self, id: CommentId) -> Result<bool, RepositoryError> {
        Ok(self.write().comments.remove(&id).is_some())
    }
}

#[async_trait]
impl FollowStore for MemoryStore {
    async fn follow(&self, follower: UserId, followee: UserId) -> Result<(), RepositoryError> {
        self.write().follows.insert((follower, followee));
        Ok(())
    }

    async fn unfollow(&self, follower: UserId, followee: UserId) -> Result<(), RepositoryError> {
        self.write().follows.remove(&(follower, followee));
        Ok(())
    }

    async fn is_following(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> Result<bool, RepositoryError> {
        Ok(self.read().follows.contains(&(follower, followee)))
    }

    async fn followees(&self, follower: UserId) -> Result<Vec<UserId>, RepositoryError> {
        let state = self.read();
        let mut ids: Vec<UserId> = state
            .follows
            .iter()
            .filter(|(f, _)| *f == follower)
            .map(|(_, followee)| *followee)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl FavouriteStore for MemoryStore {
    async fn favourite(&self, user: UserId, article: ArticleId) -> Result<(), RepositoryError> {
        let mut state = self.write();
        if !state.articles.contains_key(&article) {
            return Err(RepositoryError::NotFound);
        }
        state.favourites.insert((user, article));
        Ok(())
    }

    async fn unfavourite(&self, user: UserId, article: ArticleId) -> Result<(), RepositoryError> {
        self.write().favourites.remove(&(user, article));
        Ok(())
    }

    async fn favourited_among(
        &self,
        user: UserId,
        articles: &[ArticleId],
    ) -> Result<HashSet<ArticleId>, RepositoryError> {
        let state = self.read();
        Ok(articles
            .iter()
            .copied()
            .filter(|a| state.favourites.contains(&(user, *a)))
            .collect())
    }

    async fn counts(
        &self,
        articles: &[ArticleId],
    ) -> Result<HashMap<ArticleId, u64>, RepositoryError> {
        let state = self.read();
        let mut counts = HashMap::new();
        for (_, article) in &state.favourites {
            if articles.contains(article) {
                *counts.entry(*article).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use conduit_core::Slug;

    use super::*;

    fn new_user(email: &str, username: &str) -> NewUser {
        NewUser {
            email: Email::parse(email).unwrap(),
            username: Username::parse(username).unwrap(),
            password_hash: "hash".to_owned(),
        }
    }

    fn new_article(title: &str, author: UserId, tags: &[&str]) -> NewArticle {
        NewArticle {
            slug: Slug::from_title(title, 1),
            title: title.to_owned(),
            description: "description".to_owned(),
            body: "body".to_owned(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            author_id: author,
        }
    }

    #[tokio::test]
    async fn test_user_uniqueness() {
        let store = MemoryStore::default();
        UserStore::create(&store, new_user("a@example.com", "alice"))
            .await
            .unwrap();

        let err = UserStore::create(&store, new_user("a@example.com", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref f) if f == "email"));

        let err = UserStore::create(&store, new_user("b@example.com", "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref f) if f == "username"));
    }

    #[tokio::test]
    async fn test_credentials_round_trip_hash() {
        let store = MemoryStore::default();
        let user = UserStore::create(&store, new_user("a@example.com", "alice"))
            .await
            .unwrap();

        let email = Email::parse("A@Example.com").unwrap();
        let (found, hash) = store.find_credentials_by_email(&email).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(hash, "hash");
    }

    #[tokio::test]
    async fn test_update_unknown_user_is_not_found() {
        let store = MemoryStore::default();
        let err = UserStore::update(&store, UserId::new(99), UserChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_update_can_keep_own_email() {
        let store = MemoryStore::default();
        let user = UserStore::create(&store, new_user("a@example.com", "alice"))
            .await
            .unwrap();

        let changes = UserChanges {
            email: Some(user.email.clone()),
            bio: Some(Some("hello".to_owned())),
            ..UserChanges::default()
        };
        let updated = UserStore::update(&store, user.id, changes).await.unwrap();
        assert_eq!(updated.bio.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_delete_article_cascades() {
        let store = MemoryStore::default();
        let author = UserStore::create(&store, new_user("a@example.com", "alice"))
            .await
            .unwrap();
        let article = ArticleStore::create(&store, new_article("Hello", author.id, &[]))
            .await
            .unwrap();
        CommentStore::create(
            &store,
            NewComment {
                article_id: article.id,
                author_id: author.id,
                body: "first".to_owned(),
            },
        )
        .await
        .unwrap();
        store.favourite(author.id, article.id).await.unwrap();

        assert!(ArticleStore::delete(&store, article.id).await.unwrap());
        assert!(store.list_for_article(article.id).await.unwrap().is_empty());
        assert!(store.counts(&[article.id]).await.unwrap().is_empty());
        assert!(!ArticleStore::delete(&store, article.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_filters_and_counts() {
        let store = MemoryStore::default();
        let alice = UserStore::create(&store, new_user("a@example.com", "alice"))
            .await
            .unwrap();
        let bob = UserStore::create(&store, new_user("b@example.com", "bob"))
            .await
            .unwrap();
        ArticleStore::create(&store, new_article("One", alice.id, &["rust"]))
            .await
            .unwrap();
        ArticleStore::create(&store, new_article("Two", bob.id, &["go"]))
            .await
            .unwrap();
        let three = ArticleStore::create(&store, new_article("Three", alice.id, &["rust"]))
            .await
            .unwrap();

        let filter = ArticleFilter {
            tag: Some("rust".to_owned()),
            ..ArticleFilter::default()
        };
        let (articles, total) = store.list(&filter, Page::default()).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(articles.first().map(|a| a.id), Some(three.id));

        let (articles, total) = store
            .list(&ArticleFilter::default(), Page::new(Some(1), Some(1)))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(articles.len(), 1);

        assert_eq!(store.tags().await.unwrap(), vec!["go", "rust"]);
    }

    #[tokio::test]
    async fn test_follow_is_idempotent() {
        let store = MemoryStore::default();
        let (a, b) = (UserId::new(1), UserId::new(2));
        store.follow(a, b).await.unwrap();
        store.follow(a, b).await.unwrap();
        assert_eq!(store.followees(a).await.unwrap(), vec![b]);
        assert!(!store.is_following(b, a).await.unwrap());

        store.unfollow(a, b).await.unwrap();
        store.unfollow(a, b).await.unwrap();
        assert!(!store.is_following(a, b).await.unwrap());
    }
}
