//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::TokenConfig;
use crate::db::Stores;
use crate::services::{
    ArticleService, AuthService, CommentService, IdentityResolver, PasswordHasher,
    ProfileService, TokenError, TokenService,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The token secret and lifetime
/// are fixed at construction and never change afterwards.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    stores: Stores,
    tokens: TokenService,
    hasher: PasswordHasher,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the token configuration is unusable.
    pub fn new(token_config: &TokenConfig, stores: Stores) -> Result<Self, TokenError> {
        let tokens = TokenService::new(token_config)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                stores,
                tokens,
                hasher: PasswordHasher::new(),
            }),
        })
    }

    /// Get the store bundle.
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    /// Authentication service over this state.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(
            self.inner.stores.users.as_ref(),
            &self.inner.hasher,
            &self.inner.tokens,
        )
    }

    /// Identity resolver over this state.
    #[must_use]
    pub fn identity(&self) -> IdentityResolver<'_> {
        IdentityResolver::new(&self.inner.tokens, self.inner.stores.users.as_ref())
    }

    /// Profile service over this state.
    #[must_use]
    pub fn profiles(&self) -> ProfileService<'_> {
        ProfileService::new(&self.inner.stores)
    }

    /// Article service over this state.
    #[must_use]
    pub fn articles(&self) -> ArticleService<'_> {
        ArticleService::new(&self.inner.stores)
    }

    /// Comment service over this state.
    #[must_use]
    pub fn comments(&self) -> CommentService<'_> {
        CommentService::new(&self.inner.stores)
    }
}
