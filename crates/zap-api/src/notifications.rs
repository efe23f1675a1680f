use axum::{
    Extension, Json,
    extract::{Path, State},
};
use zap_core::notifications;
use zap_types::api::{NotificationResponse, NotificationsResponse};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Returns one notification and deletes it.
pub async fn consume(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Json<NotificationResponse>> {
    let notification = state
        .blocking(move |s| notifications::consume(s.store(), &user, &id))
        .await?;
    Ok(Json(notification))
}

/// Returns every pending notification and deletes them.
pub async fn consume_all(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<Json<NotificationsResponse>> {
    let notifications = state
        .blocking(move |s| notifications::consume_all(s.store(), &user))
        .await?;
    Ok(Json(NotificationsResponse { notifications }))
}
