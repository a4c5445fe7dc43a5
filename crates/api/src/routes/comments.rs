//! Comment handlers and JSON shapes.

use axum::{extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use conduit_core::CommentId;

use super::extract::{Json, Path};
use super::profiles::ProfileResponse;
use crate::error::Result;
use crate::middleware::{CurrentUser, MaybeUser};
use crate::models::CommentView;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewCommentRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct NewCommentEnvelope {
    pub comment: NewCommentRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: CommentId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
    pub author: ProfileResponse,
}

impl From<CommentView> for CommentResponse {
    fn from(view: CommentView) -> Self {
        Self {
            id: view.comment.id,
            created_at: view.comment.created_at,
            updated_at: view.comment.updated_at,
            body: view.comment.body,
            author: view.author.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentEnvelope {
    pub comment: CommentResponse,
}

#[derive(Debug, Serialize)]
pub struct CommentsResponse {
    pub comments: Vec<CommentResponse>,
}

/// `GET /api/articles/{slug}/comments`
pub async fn index(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(slug): Path<String>,
) -> Result<Json<CommentsResponse>> {
    let views = state.comments().list(viewer.as_ref(), &slug).await?;
    Ok(Json(CommentsResponse {
        comments: views.into_iter().map(CommentResponse::from).collect(),
    }))
}

/// `POST /api/articles/{slug}/comments`
pub async fn create(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(slug): Path<String>,
    Json(body): Json<NewCommentEnvelope>,
) -> Result<(StatusCode, Json<CommentEnvelope>)> {
    let view = state
        .comments()
        .add(&user, &slug, &body.comment.body)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CommentEnvelope {
            comment: view.into(),
        }),
    ))
}

/// `DELETE /api/articles/{slug}/comments/{id}`
pub async fn destroy(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path((slug, id)): Path<(String, CommentId)>,
) -> Result<StatusCode> {
    state.comments().delete(&user, &slug, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
