//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Readiness (store ping)
//!
//! # Users
//! POST /api/users                           - Register
//! POST /api/users/login                     - Login
//! GET  /api/user                            - Current user (auth)
//! PUT  /api/user                            - Update current user (auth)
//!
//! # Profiles
//! GET    /api/profiles/{username}           - Profile
//! POST   /api/profiles/{username}/follow    - Follow (auth)
//! DELETE /api/profiles/{username}/follow    - Unfollow (auth)
//!
//! # Articles
//! GET    /api/articles                      - List (tag, author, favorited, limit, offset)
//! GET    /api/articles/feed                 - Followed authors (auth)
//! POST   /api/articles                      - Create (auth)
//! GET    /api/articles/{slug}               - Show
//! PUT    /api/articles/{slug}               - Update (author)
//! DELETE /api/articles/{slug}               - Delete (author)
//! POST   /api/articles/{slug}/favorite      - Favourite (auth)
//! DELETE /api/articles/{slug}/favorite      - Unfavourite (auth)
//!
//! # Comments
//! GET    /api/articles/{slug}/comments      - List
//! POST   /api/articles/{slug}/comments      - Add (auth)
//! DELETE /api/articles/{slug}/comments/{id} - Delete (comment author)
//!
//! # Tags
//! GET  /api/tags                            - All tags
//! ```

pub mod articles;
pub mod comments;
pub mod extract;
pub mod profiles;
pub mod tags;
pub mod users;

use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::{Request, Response, StatusCode},
    middleware,
    routing::{delete, get, post},
};
use serde::{Deserialize, Deserializer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{authenticate, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(users::register))
        .route("/users/login", post(users::login))
        .route("/user", get(users::current).put(users::update))
}

/// Create the profile routes router.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profiles/{username}", get(profiles::show))
        .route(
            "/profiles/{username}/follow",
            post(profiles::follow).delete(profiles::unfollow),
        )
}

/// Create the article and comment routes router.
pub fn article_routes() -> Router<AppState> {
    Router::new()
        .route("/articles", get(articles::index).post(articles::create))
        .route("/articles/feed", get(articles::feed))
        .route(
            "/articles/{slug}",
            get(articles::show)
                .put(articles::update)
                .delete(articles::destroy),
        )
        .route(
            "/articles/{slug}/favorite",
            post(articles::favourite).delete(articles::unfavourite),
        )
        .route(
            "/articles/{slug}/comments",
            get(comments::index).post(comments::create),
        )
        .route("/articles/{slug}/comments/{id}", delete(comments::destroy))
}

/// Create all `/api` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(user_routes())
        .merge(profile_routes())
        .merge(article_routes())
        .route("/tags", get(tags::index))
}

/// The complete application: routes, health checks and the middleware stack.
///
/// Sentry layers are added by the binary around this router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", routes())
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.stores().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Deserialize a field that distinguishes "absent" from `null`.
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: absent is `None`, `null` is `Some(None)`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
