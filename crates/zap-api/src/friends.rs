use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;
use zap_core::friends::{FriendService, RequestOutcome};
use zap_types::api::{FriendRequestsResponse, FriendsResponse};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub async fn list_friends(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<Json<FriendsResponse>> {
    let friends = state
        .blocking(move |s| FriendService::new(s.store(), &s.settings).friends(&user))
        .await?;
    Ok(Json(FriendsResponse { friends }))
}

pub async fn list_requests(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<Json<FriendRequestsResponse>> {
    let requests = state
        .blocking(move |s| FriendService::new(s.store(), &s.settings).requests(&user))
        .await?;
    Ok(Json(requests))
}

/// Sends a request, or completes the friendship when the other side asked
/// first.
pub async fn send_request(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(handle): Path<String>,
) -> AppResult<StatusCode> {
    let sender_id = user.id.clone();
    let target = handle.clone();
    let outcome = state
        .blocking(move |s| FriendService::new(s.store(), &s.settings).request(&user, &target))
        .await?;
    match outcome {
        RequestOutcome::Befriended => info!("User {} is now friends with {}", sender_id, handle),
        RequestOutcome::Requested { push } => {
            info!("User {} sent a friend request to {}", sender_id, handle);
            state.push(push.into_iter().collect());
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_request(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(handle): Path<String>,
) -> AppResult<StatusCode> {
    state
        .blocking(move |s| FriendService::new(s.store(), &s.settings).cancel(&user, &handle))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn accept_request(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(sender_id): Path<String>,
) -> AppResult<StatusCode> {
    state
        .blocking(move |s| FriendService::new(s.store(), &s.settings).accept(&user, &sender_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reject_request(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(sender_id): Path<String>,
) -> AppResult<StatusCode> {
    state
        .blocking(move |s| FriendService::new(s.store(), &s.settings).reject(&user, &sender_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
