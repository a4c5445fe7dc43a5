//! Integration tests for Conduit.
//!
//! Each test spawns the full router (middleware stack included) on an
//! ephemeral local port, backed by the in-memory stores, and talks to it
//! over real HTTP with `reqwest`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p conduit-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth` - registration, login, bearer tokens, the authentication gate
//! - `articles` - articles, comments, favourites, feed and tags
//! - `http` - health checks and response headers

use std::net::SocketAddr;
use std::time::Duration;

use conduit_api::config::TokenConfig;
use conduit_api::db::Stores;
use conduit_api::routes;
use conduit_api::state::AppState;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Signing secret shared by every test server.
pub const TEST_SECRET: &str = "integration-test-secret-0123456789-abcdefghij";

/// Default token lifetime for test servers.
pub const TEST_SESSION: Duration = Duration::from_secs(3600);

/// A running API server with its own empty in-memory store.
pub struct TestServer {
    addr: SocketAddr,
    client: Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with the default token lifetime.
    ///
    /// # Panics
    ///
    /// Panics if the server cannot bind a local port.
    pub async fn spawn() -> Self {
        Self::spawn_with_session(TEST_SESSION).await
    }

    /// Start a server whose tokens live for `session`.
    ///
    /// # Panics
    ///
    /// Panics if the token settings are rejected or no port can be bound.
    pub async fn spawn_with_session(session: Duration) -> Self {
        let config = TokenConfig {
            secret: SecretString::from(TEST_SECRET),
            session_lifetime: session,
        };
        let state = AppState::new(&config, Stores::in_memory()).expect("valid token config");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, routes::app(state))
                .await
                .expect("test server");
        });

        Self {
            addr,
            client: Client::new(),
            handle,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// `GET path`, optionally with a `Token` authorization header.
    #[must_use]
    pub fn get(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_token(self.client.get(self.url(path)), token)
    }

    /// `POST path` with a JSON body.
    #[must_use]
    pub fn post(&self, path: &str, token: Option<&str>, body: &Value) -> RequestBuilder {
        with_token(self.client.post(self.url(path)), token).json(body)
    }

    /// `PUT path` with a JSON body.
    #[must_use]
    pub fn put(&self, path: &str, token: Option<&str>, body: &Value) -> RequestBuilder {
        with_token(self.client.put(self.url(path)), token).json(body)
    }

    /// `DELETE path`.
    #[must_use]
    pub fn delete(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_token(self.client.delete(self.url(path)), token)
    }

    /// Register `username` (email `<username>@example.com`, password
    /// `password123`) and return the issued token.
    ///
    /// # Panics
    ///
    /// Panics if registration does not succeed.
    pub async fn register(&self, username: &str) -> String {
        let resp = self
            .post(
                "/api/users",
                None,
                &json!({
                    "user": {
                        "username": username,
                        "email": format!("{username}@example.com"),
                        "password": "password123",
                    }
                }),
            )
            .send()
            .await
            .expect("register request");

        assert_eq!(resp.status(), StatusCode::CREATED, "register {username}");
        let body = json_body(resp).await;
        body["user"]["token"]
            .as_str()
            .expect("token in response")
            .to_owned()
    }

    /// Create an article as `token`'s user and return its slug.
    ///
    /// # Panics
    ///
    /// Panics if creation does not succeed.
    pub async fn create_article(&self, token: &str, title: &str, tags: &[&str]) -> String {
        let resp = self
            .post(
                "/api/articles",
                Some(token),
                &json!({
                    "article": {
                        "title": title,
                        "description": format!("About {title}"),
                        "body": format!("All about {title}."),
                        "tagList": tags,
                    }
                }),
            )
            .send()
            .await
            .expect("create article request");

        assert_eq!(resp.status(), StatusCode::CREATED, "create {title}");
        let body = json_body(resp).await;
        body["article"]["slug"]
            .as_str()
            .expect("slug in response")
            .to_owned()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn with_token(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => builder.header("Authorization", format!("Token {token}")),
        None => builder,
    }
}

/// Read a response body as JSON.
///
/// # Panics
///
/// Panics if the body is not valid JSON.
pub async fn json_body(resp: Response) -> Value {
    resp.json().await.expect("JSON response body")
}

/// The first message of a `{"errors":{"body":[...]}}` error body.
///
/// # Panics
///
/// Panics if the body does not have that shape.
pub async fn error_message(resp: Response) -> String {
    let body = json_body(resp).await;
    body["errors"]["body"][0]
        .as_str()
        .expect("error message")
        .to_owned()
}
