use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use zap_core::zaps::ZapService;
use zap_types::api::{CreateReactionImageRequest, ReactionImageResponse};

use crate::error::AppResult;
use crate::found;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Reserves an image for a reaction and returns where to upload it.
pub async fn create_image(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateReactionImageRequest>,
) -> AppResult<(StatusCode, Json<ReactionImageResponse>)> {
    let image = state
        .blocking(move |s| {
            ZapService::new(s.store(), s.assets(), &s.settings).create_reaction_image(&user, req.kind)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(image)))
}

pub async fn mark_image_uploaded(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state
        .blocking(move |s| {
            ZapService::new(s.store(), s.assets(), &s.settings).mark_reaction_image_uploaded(&user, &id)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn picture(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let url = state
        .blocking(move |s| {
            ZapService::new(s.store(), s.assets(), &s.settings).reaction_image(&user, &id)
        })
        .await?;
    Ok(found(url))
}

pub async fn delete_reaction(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state
        .blocking(move |s| {
            ZapService::new(s.store(), s.assets(), &s.settings).delete_reaction(&user, &id)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
