//! Article handlers and JSON shapes.

use axum::{extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use conduit_core::Page;

use super::extract::{Json, Path, Query};
use super::profiles::ProfileResponse;
use crate::error::Result;
use crate::middleware::{CurrentUser, MaybeUser};
use crate::models::ArticleView;
use crate::services::{ArticleInput, ArticleQuery, ArticleUpdate};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleEnvelope<T> {
    pub article: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticleRequest {
    pub title: String,
    pub description: String,
    pub body: String,
    #[serde(default)]
    pub tag_list: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateArticleRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
}

/// Query string of `GET /api/articles`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub tag: Option<String>,
    pub author: Option<String>,
    pub favorited: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Query string of `GET /api/articles/feed`.
#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub favorited: bool,
    pub favorites_count: u64,
    pub author: ProfileResponse,
}

impl From<ArticleView> for ArticleResponse {
    fn from(view: ArticleView) -> Self {
        let article = view.article;
        Self {
            slug: article.slug.as_str().to_owned(),
            title: article.title,
            description: article.description,
            body: article.body,
            tag_list: article.tags,
            created_at: article.created_at,
            updated_at: article.updated_at,
            favorited: view.favourited,
            favorites_count: view.favourites_count,
            author: view.author.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesResponse {
    pub articles: Vec<ArticleResponse>,
    pub articles_count: u64,
}

impl ArticlesResponse {
    fn new(views: Vec<ArticleView>, total: u64) -> Self {
        Self {
            articles: views.into_iter().map(ArticleResponse::from).collect(),
            articles_count: total,
        }
    }
}

fn envelope(view: ArticleView) -> Json<ArticleEnvelope<ArticleResponse>> {
    Json(ArticleEnvelope {
        article: view.into(),
    })
}

/// `GET /api/articles`
pub async fn index(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(params): Query<ListParams>,
) -> Result<Json<ArticlesResponse>> {
    let query = ArticleQuery {
        tag: params.tag,
        author: params.author,
        favorited: params.favorited,
    };
    let page = Page::new(params.offset, params.limit);

    let (views, total) = state.articles().list(viewer.as_ref(), query, page).await?;
    Ok(Json(ArticlesResponse::new(views, total)))
}

/// `GET /api/articles/feed`
pub async fn feed(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Query(params): Query<FeedParams>,
) -> Result<Json<ArticlesResponse>> {
    let page = Page::new(params.offset, params.limit);

    let (views, total) = state.articles().feed(&user, page).await?;
    Ok(Json(ArticlesResponse::new(views, total)))
}

/// `POST /api/articles`
pub async fn create(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Json(body): Json<ArticleEnvelope<NewArticleRequest>>,
) -> Result<(StatusCode, Json<ArticleEnvelope<ArticleResponse>>)> {
    let req = body.article;
    let input = ArticleInput {
        title: req.title,
        description: req.description,
        body: req.body,
        tags: req.tag_list,
    };

    let view = state.articles().create(&user, input).await?;
    Ok((StatusCode::CREATED, envelope(view)))
}

/// `GET /api/articles/{slug}`
pub async fn show(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(slug): Path<String>,
) -> Result<Json<ArticleEnvelope<ArticleResponse>>> {
    let view = state.articles().get(viewer.as_ref(), &slug).await?;
    Ok(envelope(view))
}

/// `PUT /api/articles/{slug}`
pub async fn update(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(slug): Path<String>,
    Json(body): Json<ArticleEnvelope<UpdateArticleRequest>>,
) -> Result<Json<ArticleEnvelope<ArticleResponse>>> {
    let req = body.article;
    let update = ArticleUpdate {
        title: req.title,
        description: req.description,
        body: req.body,
    };

    let view = state.articles().update(&user, &slug, update).await?;
    Ok(envelope(view))
}

/// `DELETE /api/articles/{slug}`
pub async fn destroy(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(slug): Path<String>,
) -> Result<StatusCode> {
    state.articles().delete(&user, &slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/articles/{slug}/favorite`
pub async fn favourite(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(slug): Path<String>,
) -> Result<Json<ArticleEnvelope<ArticleResponse>>> {
    let view = state.articles().favourite(&user, &slug).await?;
    Ok(envelope(view))
}

/// `DELETE /api/articles/{slug}/favorite`
pub async fn unfavourite(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(slug): Path<String>,
) -> Result<Json<ArticleEnvelope<ArticleResponse>>> {
    let view = state.articles().unfavourite(&user, &slug).await?;
    Ok(envelope(view))
}
