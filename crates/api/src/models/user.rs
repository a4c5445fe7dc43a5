//! User domain types.

use chrono::{DateTime, Utc};

use conduit_core::{Email, UserId, Username};

/// A registered user.
///
/// Deliberately carries no password hash: the hash only leaves the store
/// through [`crate::db::UserStore::find_credentials_by_email`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique, normalized email address.
    pub email: Email,
    /// Unique public handle.
    pub username: Username,
    /// Free-form biography.
    pub bio: Option<String>,
    /// Avatar URL.
    pub image: Option<String>,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public view of this user as seen by someone who does (or does not) follow them.
    #[must_use]
    pub fn profile(&self, following: bool) -> Profile {
        Profile {
            username: self.username.clone(),
            bio: self.bio.clone(),
            image: self.image.clone(),
            following,
        }
    }
}

/// Fields required to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub username: Username,
    pub password_hash: String,
}

/// Partial update of a user. `None` leaves a field untouched.
///
/// For `bio` and `image`, `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<Email>,
    pub username: Option<Username>,
    pub password_hash: Option<String>,
    pub bio: Option<Option<String>>,
    pub image: Option<Option<String>>,
}

impl UserChanges {
    /// Apply these changes to an in-memory user.
    pub fn apply(self, user: &mut User, now: DateTime<Utc>) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(bio) = self.bio {
            user.bio = bio;
        }
        if let Some(image) = self.image {
            user.image = image;
        }
        user.updated_at = now;
    }
}

/// A user's public profile relative to a viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub username: Username,
    pub bio: Option<String>,
    pub image: Option<String>,
    /// Whether the viewer follows this user (always `false` for anonymous viewers).
    pub following: bool,
}
