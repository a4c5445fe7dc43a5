//! Public profiles and following.

use axum::extract::State;
use serde::Serialize;

use super::extract::{Json, Path};
use crate::error::Result;
use crate::middleware::{CurrentUser, MaybeUser};
use crate::models::Profile;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub following: bool,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            username: profile.username.as_str().to_owned(),
            bio: profile.bio,
            image: profile.image,
            following: profile.following,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileEnvelope {
    pub profile: ProfileResponse,
}

impl From<Profile> for ProfileEnvelope {
    fn from(profile: Profile) -> Self {
        Self {
            profile: profile.into(),
        }
    }
}

/// `GET /api/profiles/{username}`
pub async fn show(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(username): Path<String>,
) -> Result<Json<ProfileEnvelope>> {
    let profile = state.profiles().get(viewer.as_ref(), &username).await?;
    Ok(Json(profile.into()))
}

/// `POST /api/profiles/{username}/follow`
pub async fn follow(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<ProfileEnvelope>> {
    let profile = state.profiles().follow(&user, &username).await?;
    Ok(Json(profile.into()))
}

/// `DELETE /api/profiles/{username}/follow`
pub async fn unfollow(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<ProfileEnvelope>> {
    let profile = state.profiles().unfollow(&user, &username).await?;
    Ok(Json(profile.into()))
}
