//! Registration, login and the current user.

use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use super::extract::Json;
use super::nullable;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::User;
use crate::services::UserUpdate;
use crate::state::AppState;

/// `{"user": ...}` envelope used by every request and response here.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserEnvelope<T> {
    pub user: T,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image: Option<Option<String>>,
}

/// The authenticated user as returned to themselves.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub email: String,
    pub token: String,
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

impl UserResponse {
    fn new(user: User, token: String) -> UserEnvelope<Self> {
        UserEnvelope {
            user: Self {
                email: user.email.into_inner(),
                token,
                username: user.username.as_str().to_owned(),
                bio: user.bio,
                image: user.image,
            },
        }
    }
}

/// `POST /api/users`
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<UserEnvelope<RegisterRequest>>,
) -> Result<(StatusCode, Json<UserEnvelope<UserResponse>>)> {
    let auth = state.auth();
    let req = body.user;

    let user = auth.register(&req.email, &req.username, &req.password).await?;
    let token = auth.issue_token(&user)?;

    Ok((StatusCode::CREATED, Json(UserResponse::new(user, token))))
}

/// `POST /api/users/login`
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<UserEnvelope<LoginRequest>>,
) -> Result<Json<UserEnvelope<UserResponse>>> {
    let auth = state.auth();

    let user = auth.login(&body.user.email, &body.user.password).await?;
    let token = auth.issue_token(&user)?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(Json(UserResponse::new(user, token)))
}

/// `GET /api/user`
pub async fn current(
    State(state): State<AppState>,
    CurrentUser { user, token }: CurrentUser,
) -> Result<Json<UserEnvelope<UserResponse>>> {
    let token = match token {
        Some(token) => token,
        None => state.auth().issue_token(&user)?,
    };
    Ok(Json(UserResponse::new(user, token)))
}

/// `PUT /api/user`
pub async fn update(
    State(state): State<AppState>,
    CurrentUser { user, token }: CurrentUser,
    Json(body): Json<UserEnvelope<UpdateUserRequest>>,
) -> Result<Json<UserEnvelope<UserResponse>>> {
    let auth = state.auth();
    let req = body.user;

    let updated = auth
        .update(
            user.id,
            UserUpdate {
                email: req.email,
                username: req.username,
                password: req.password,
                bio: req.bio,
                image: req.image,
            },
        )
        .await?;

    let token = match token {
        Some(token) => token,
        None => auth.issue_token(&updated)?,
    };
    Ok(Json(UserResponse::new(updated, token)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let req: UserEnvelope<UpdateUserRequest> =
            serde_json::from_str(r#"{"user": {"bio": null}}"#).unwrap();
        assert_eq!(req.user.bio, Some(None));
        assert_eq!(req.user.image, None);

        let req: UserEnvelope<UpdateUserRequest> =
            serde_json::from_str(r#"{"user": {"image": "https://x.com/a.png"}}"#).unwrap();
        assert_eq!(req.user.image, Some(Some("https://x.com/a.png".to_owned())));
    }
}
