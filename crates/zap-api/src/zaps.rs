use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use chrono::Utc;
use zap_core::zaps::ZapService;
use zap_types::api::{
    CreateCommentRequest, CreateReactionRequest, CreateZapRequest, CreateZapResponse,
    CreatedResponse,
};
use zap_types::models::ZapSide;

use crate::error::AppResult;
use crate::found;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub async fn create_zap(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateZapRequest>,
) -> AppResult<(StatusCode, Json<CreateZapResponse>)> {
    let created = state
        .blocking(move |s| {
            ZapService::new(s.store(), s.assets(), &s.settings).create(
                &user,
                req.timestamp,
                req.repost_of.as_deref(),
                Utc::now(),
            )
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn mark_uploaded(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state
        .blocking(move |s| {
            ZapService::new(s.store(), s.assets(), &s.settings).mark_uploaded(&user, &id)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn picture(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, side)): Path<(String, ZapSide)>,
) -> AppResult<Response> {
    let url = state
        .blocking(move |s| {
            ZapService::new(s.store(), s.assets(), &s.settings).image(&user, &id, side, Utc::now())
        })
        .await?;
    Ok(found(url))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    let comment_id = state
        .blocking(move |s| {
            ZapService::new(s.store(), s.assets(), &s.settings).add_comment(&user, &id, &req.content)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: comment_id })))
}

pub async fn add_reaction(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<CreateReactionRequest>,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    let reaction_id = state
        .blocking(move |s| {
            ZapService::new(s.store(), s.assets(), &s.settings).add_reaction(
                &user,
                &id,
                req.kind,
                &req.image_id,
            )
        })
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: reaction_id })))
}
