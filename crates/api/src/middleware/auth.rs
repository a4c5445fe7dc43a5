//! Authentication gate and extractors.
//!
//! [`authenticate`] runs on every request: it reads the `Authorization`
//! header, resolves an [`AuthContext`] and stores it in the request
//! extensions. Protected routes reached without an identity get `401`
//! before any handler runs.
//!
//! Handlers then use [`CurrentUser`] or [`MaybeUser`] to read the context.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{Method, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::Span;

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::{AuthContext, Principal};
use crate::state::AppState;

/// Whether `method path` is reachable without an identity.
///
/// Public: registration, login, read-only browsing of articles, profiles and
/// tags, and health checks.
#[must_use]
pub fn is_public(method: &Method, path: &str) -> bool {
    let path = path.trim_end_matches('/');

    if *method == Method::POST {
        return matches!(path, "/api/users" | "/api/users/login");
    }
    if *method == Method::GET {
        return matches!(path, "/api/tags" | "/api/articles" | "/health" | "/health/ready")
            || path.starts_with("/api/articles/")
            || path.starts_with("/api/profiles/");
    }
    false
}

/// Resolve the caller and enforce the public/protected split.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let principal = Principal::from_authorization(
        request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
    );

    let context = match state.identity().resolve(principal).await {
        Ok(context) => context,
        Err(e) => return AppError::from(e).into_response(),
    };

    if let Some(user) = context.current_user() {
        Span::current().record("user_id", user.id.as_i64());
        set_sentry_user(&user.id, Some(user.username.as_str()));
    } else if !is_public(request.method(), request.uri().path()) {
        tracing::debug!(path = %request.uri().path(), "anonymous request to protected route");
        return AppError::Unauthorized("authentication required".to_owned()).into_response();
    }

    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Extractor that requires an authenticated caller.
///
/// Rejects with `401` if the request is anonymous.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentUser { user, .. }: CurrentUser) -> String {
///     format!("Hello, {}!", user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// The authenticated user.
    pub user: User,
    /// The token presented with this request, if it came from a bearer token.
    pub token: Option<String>,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = parts.extensions.get::<AuthContext>();

        match context.and_then(|c| c.current_user().map(|u| (u, c.current_token()))) {
            Some((user, token)) => Ok(Self {
                user: user.clone(),
                token: token.map(String::from),
            }),
            None => Err(AppError::Unauthorized("authentication required".to_owned())),
        }
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `CurrentUser`, this does not reject anonymous requests.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<AuthContext>()
                .and_then(AuthContext::current_user)
                .cloned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_routes() {
        assert!(is_public(&Method::POST, "/api/users"));
        assert!(is_public(&Method::POST, "/api/users/login"));
        assert!(is_public(&Method::GET, "/api/articles"));
        assert!(is_public(&Method::GET, "/api/articles/some-slug-1"));
        assert!(is_public(&Method::GET, "/api/articles/some-slug-1/comments"));
        assert!(is_public(&Method::GET, "/api/profiles/alice"));
        assert!(is_public(&Method::GET, "/api/tags"));
        assert!(is_public(&Method::GET, "/health/ready"));
    }

    #[test]
    fn test_protected_routes() {
        assert!(!is_public(&Method::GET, "/api/user"));
        assert!(!is_public(&Method::PUT, "/api/user"));
        assert!(!is_public(&Method::POST, "/api/articles"));
        assert!(!is_public(&Method::DELETE, "/api/articles/slug-1"));
        assert!(!is_public(&Method::POST, "/api/profiles/alice/follow"));
        assert!(!is_public(&Method::GET, "/api/userz"));
        assert!(!is_public(&Method::GET, "/api/profiles"));
    }
}
