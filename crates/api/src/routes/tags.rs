//! Tag listing.

use axum::extract::State;
use serde::Serialize;

use super::extract::Json;
use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

/// `GET /api/tags`
pub async fn index(State(state): State<AppState>) -> Result<Json<TagsResponse>> {
    let tags = state.articles().tags().await?;
    Ok(Json(TagsResponse { tags }))
}
