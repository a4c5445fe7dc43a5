//! Per-request identity resolution.
//!
//! A request arrives with some [`Principal`]; the [`IdentityResolver`] turns it
//! into an [`AuthContext`] that handlers read the current user from.

use conduit_core::{Email, Username};

use crate::db::{RepositoryError, UserStore};
use crate::models::User;
use crate::services::TokenService;

/// Principal name that transport layers use for "nobody".
const ANONYMOUS_NAME: &str = "anonymousUser";

/// What a request claims to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// No credentials.
    Anonymous,
    /// A raw bearer token, not yet verified.
    Bearer(String),
    /// A principal already authenticated by the transport, named by email or
    /// username.
    Authenticated(String),
}

impl Principal {
    /// Read the principal from an `Authorization` header value.
    ///
    /// Accepts `Token <jwt>` and `Bearer <jwt>`. Anything else, including an
    /// empty token, is anonymous.
    #[must_use]
    pub fn from_authorization(header: Option<&str>) -> Self {
        let Some(value) = header else {
            return Self::Anonymous;
        };

        let token = ["Token ", "Bearer "]
            .iter()
            .find_map(|scheme| value.strip_prefix(scheme))
            .map(str::trim);

        match token {
            Some(token) if !token.is_empty() => Self::Bearer(token.to_owned()),
            _ => Self::Anonymous,
        }
    }
}

/// The identity bound to one request.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    user: Option<User>,
    token: Option<String>,
}

impl AuthContext {
    /// A context with no identity.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            user: None,
            token: None,
        }
    }

    /// A context bound to `user`, optionally with the token that proved it.
    #[must_use]
    pub const fn authenticated(user: User, token: Option<String>) -> Self {
        Self {
            user: Some(user),
            token,
        }
    }

    /// The resolved user, if any.
    #[must_use]
    pub const fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// The raw token that authenticated this request, if any.
    #[must_use]
    pub fn current_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Whether no user is bound.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.user.is_none()
    }
}

/// Turns principals into authentication contexts.
pub struct IdentityResolver<'a> {
    tokens: &'a TokenService,
    users: &'a dyn UserStore,
}

impl<'a> IdentityResolver<'a> {
    /// Create a resolver over a token service and the user store.
    #[must_use]
    pub const fn new(tokens: &'a TokenService, users: &'a dyn UserStore) -> Self {
        Self { tokens, users }
    }

    /// Resolve `principal` to a context.
    ///
    /// Bad, expired or orphaned tokens and unknown names yield an anonymous
    /// context.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the user store fails; a store outage is
    /// not treated as "anonymous".
    pub async fn resolve(&self, principal: Principal) -> Result<AuthContext, RepositoryError> {
        match principal {
            Principal::Anonymous => Ok(AuthContext::anonymous()),
            Principal::Bearer(token) => {
                let Some(user_id) = self.tokens.resolve(&token) else {
                    return Ok(AuthContext::anonymous());
                };

                match self.users.find_by_id(user_id).await? {
                    Some(user) => Ok(AuthContext::authenticated(user, Some(token))),
                    None => {
                        tracing::debug!(%user_id, "token subject no longer exists");
                        Ok(AuthContext::anonymous())
                    }
                }
            }
            Principal::Authenticated(name) => {
                if name == ANONYMOUS_NAME {
                    return Ok(AuthContext::anonymous());
                }

                Ok(self
                    .find_by_name(&name)
                    .await?
                    .map_or_else(AuthContext::anonymous, |user| {
                        AuthContext::authenticated(user, None)
                    }))
            }
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<User>, RepositoryError> {
        if let Ok(email) = Email::parse(name)
            && let Some(user) = self.users.find_by_email(&email).await?
        {
            return Ok(Some(user));
        }

        match Username::parse(name) {
            Ok(username) => self.users.find_by_username(&username).await,
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use secrecy::SecretString;

    use conduit_core::UserId;

    use super::*;
    use crate::config::TokenConfig;
    use crate::db::MemoryStore;
    use crate::models::{NewUser, UserChanges};

    fn tokens() -> TokenService {
        TokenService::new(&TokenConfig {
            secret: SecretString::from("q8Zr!3vLx@9TmK2#pW7s$Nd4&Hf6*Jb1"),
            session_lifetime: Duration::from_secs(3600),
        })
        .unwrap()
    }

    async fn store_with_alice() -> (MemoryStore, User) {
        let store = MemoryStore::default();
        let alice = UserStore::create(
            &store,
            NewUser {
                email: Email::parse("a@x.com").unwrap(),
                username: Username::parse("alice").unwrap(),
                password_hash: "hash".to_owned(),
            },
        )
        .await
        .unwrap();
        (store, alice)
    }

    #[test]
    fn test_principal_from_header() {
        assert_eq!(Principal::from_authorization(None), Principal::Anonymous);
        assert_eq!(
            Principal::from_authorization(Some("Token abc")),
            Principal::Bearer("abc".to_owned())
        );
        assert_eq!(
            Principal::from_authorization(Some("Bearer abc")),
            Principal::Bearer("abc".to_owned())
        );
        assert_eq!(
            Principal::from_authorization(Some("Basic abc")),
            Principal::Anonymous
        );
        assert_eq!(
            Principal::from_authorization(Some("Token ")),
            Principal::Anonymous
        );
    }

    #[tokio::test]
    async fn test_bearer_resolves_to_user() {
        let (store, alice) = store_with_alice().await;
        let tokens = tokens();
        let token = tokens.issue(alice.id, Utc::now()).unwrap();

        let ctx = IdentityResolver::new(&tokens, &store)
            .resolve(Principal::Bearer(token.clone()))
            .await
            .unwrap();

        assert_eq!(ctx.current_user().map(|u| u.id), Some(alice.id));
        assert_eq!(ctx.current_token(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn test_bad_token_and_unknown_subject_are_anonymous() {
        let (store, _) = store_with_alice().await;
        let tokens = tokens();
        let resolver = IdentityResolver::new(&tokens, &store);

        let ctx = resolver
            .resolve(Principal::Bearer("not-a-token".to_owned()))
            .await
            .unwrap();
        assert!(ctx.is_anonymous());
        assert_eq!(ctx.current_token(), None);

        let orphan = tokens.issue(UserId::new(999), Utc::now()).unwrap();
        let ctx = resolver.resolve(Principal::Bearer(orphan)).await.unwrap();
        assert!(ctx.is_anonymous());
    }

    #[tokio::test]
    async fn test_named_principal_by_email_or_username() {
        let (store, alice) = store_with_alice().await;
        let tokens = tokens();
        let resolver = IdentityResolver::new(&tokens, &store);

        for name in ["a@x.com", "alice"] {
            let ctx = resolver
                .resolve(Principal::Authenticated(name.to_owned()))
                .await
                .unwrap();
            assert_eq!(ctx.current_user().map(|u| u.id), Some(alice.id));
            assert_eq!(ctx.current_token(), None);
        }

        let ctx = resolver
            .resolve(Principal::Authenticated(ANONYMOUS_NAME.to_owned()))
            .await
            .unwrap();
        assert!(ctx.is_anonymous());
    }

    struct FailingStore;

    #[async_trait]
    impl UserStore for FailingStore {
        async fn find_by_id(&self, _: UserId) -> Result<Option<User>, RepositoryError> {
            Err(RepositoryError::DataCorruption("store offline".to_owned()))
        }
        async fn find_by_ids(&self, _: &[UserId]) -> Result<Vec<User>, RepositoryError> {
            Err(RepositoryError::DataCorruption("store offline".to_owned()))
        }
        async fn find_by_email(&self, _: &Email) -> Result<Option<User>, RepositoryError> {
            Err(RepositoryError::DataCorruption("store offline".to_owned()))
        }
        async fn find_by_username(&self, _: &Username) -> Result<Option<User>, RepositoryError> {
            Err(RepositoryError::DataCorruption("store offline".to_owned()))
        }
        async fn find_credentials_by_email(
            &self,
            _: &Email,
        ) -> Result<Option<(User, String)>, RepositoryError> {
            Err(RepositoryError::DataCorruption("store offline".to_owned()))
        }
        async fn create(&self, _: NewUser) -> Result<User, RepositoryError> {
            Err(RepositoryError::DataCorruption("store offline".to_owned()))
        }
        async fn update(&self, _: UserId, _: UserChanges) -> Result<User, RepositoryError> {
            Err(RepositoryError::DataCorruption("store offline".to_owned()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_not_anonymous() {
        let tokens = tokens();
        let token = tokens.issue(UserId::new(1), Utc::now()).unwrap();

        let result = IdentityResolver::new(&tokens, &FailingStore)
            .resolve(Principal::Bearer(token))
            .await;
        assert!(result.is_err());
    }
}
