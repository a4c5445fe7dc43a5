//! Public profiles and follow relations.

use std::collections::{HashMap, HashSet};

use conduit_core::{UserId, Username};

use super::ContentError;
use crate::db::{RepositoryError, Stores};
use crate::models::{Profile, User};

/// Profile operations relative to a viewer.
pub struct ProfileService<'a> {
    stores: &'a Stores,
}

impl<'a> ProfileService<'a> {
    /// Create a new profile service.
    #[must_use]
    pub const fn new(stores: &'a Stores) -> Self {
        Self { stores }
    }

    /// The profile of `username` as seen by `viewer`.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::ProfileNotFound` for an unknown username.
    pub async fn get(&self, viewer: Option<&User>, username: &str) -> Result<Profile, ContentError> {
        let user = self.find(username).await?;
        let following = match viewer {
            Some(viewer) => self.stores.follows.is_following(viewer.id, user.id).await?,
            None => false,
        };
        Ok(user.profile(following))
    }

    /// Make `viewer` follow `username`. Following twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::ProfileNotFound` for an unknown username and
    /// `ContentError::Invalid` when following yourself.
    pub async fn follow(&self, viewer: &User, username: &str) -> Result<Profile, ContentError> {
        let user = self.find(username).await?;
        if user.id == viewer.id {
            return Err(ContentError::Invalid("you cannot follow yourself".to_owned()));
        }

        self.stores.follows.follow(viewer.id, user.id).await?;
        tracing::debug!(follower = %viewer.id, followee = %user.id, "followed");
        Ok(user.profile(true))
    }

    /// Make `viewer` stop following `username`. Unfollowing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::ProfileNotFound` for an unknown username.
    pub async fn unfollow(&self, viewer: &User, username: &str) -> Result<Profile, ContentError> {
        let user = self.find(username).await?;
        self.stores.follows.unfollow(viewer.id, user.id).await?;
        Ok(user.profile(false))
    }

    async fn find(&self, username: &str) -> Result<User, ContentError> {
        let Ok(username) = Username::parse(username) else {
            return Err(ContentError::ProfileNotFound);
        };
        self.stores
            .users
            .find_by_username(&username)
            .await?
            .ok_or(ContentError::ProfileNotFound)
    }
}

/// Profiles of `authors` as seen by `viewer`, keyed by user ID.
///
/// One user lookup and at most one follow lookup regardless of how many
/// authors are asked for.
pub(crate) async fn profiles_for(
    stores: &Stores,
    viewer: Option<&User>,
    authors: &[UserId],
) -> Result<HashMap<UserId, Profile>, RepositoryError> {
    let mut ids = authors.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let users = stores.users.find_by_ids(&ids).await?;
    let followed: HashSet<UserId> = match viewer {
        Some(viewer) => stores
            .follows
            .followees(viewer.id)
            .await?
            .into_iter()
            .collect(),
        None => HashSet::new(),
    };

    Ok(users
        .iter()
        .map(|u| (u.id, u.profile(followed.contains(&u.id))))
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use conduit_core::Email;

    use super::*;
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

    #[tokio::test]
    async fn test_follow_reflected_in_profile() {
        let stores = Stores::in_memory();
        let alice = register(&stores, "a@x.com", "alice").await;
        register(&stores, "b@x.com", "bob").await;
        let profiles = ProfileService::new(&stores);

        assert!(!profiles.get(Some(&alice), "bob").await.unwrap().following);

        profiles.follow(&alice, "bob").await.unwrap();
        profiles.follow(&alice, "bob").await.unwrap();
        assert!(profiles.get(Some(&alice), "bob").await.unwrap().following);
        assert!(!profiles.get(None, "bob").await.unwrap().following);

        profiles.unfollow(&alice, "bob").await.unwrap();
        assert!(!profiles.get(Some(&alice), "bob").await.unwrap().following);
    }

    #[tokio::test]
    async fn test_cannot_follow_self_or_ghosts() {
        let stores = Stores::in_memory();
        let alice = register(&stores, "a@x.com", "alice").await;
        let profiles = ProfileService::new(&stores);

        assert!(matches!(
            profiles.follow(&alice, "alice").await,
            Err(ContentError::Invalid(_))
        ));
        assert!(matches!(
            profiles.follow(&alice, "ghost").await,
            Err(ContentError::ProfileNotFound)
        ));
    }
}
