use axum::{Extension, Json, extract::State, http::StatusCode};
use tracing::info;
use zap_core::profiles::ProfileService;
use zap_types::api::{DeviceTokenRequest, ProfileResponse, UploadUrlResponse};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<Json<ProfileResponse>> {
    let profile = state
        .blocking(move |s| ProfileService::new(s.store(), s.assets(), &s.settings).profile(&user))
        .await?;
    Ok(Json(profile))
}

pub async fn set_profile_picture(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<Json<UploadUrlResponse>> {
    let upload_url = state
        .blocking(move |s| {
            ProfileService::new(s.store(), s.assets(), &s.settings).set_profile_picture(&user)
        })
        .await?;
    Ok(Json(UploadUrlResponse { upload_url }))
}

/// Registers the device that receives push notifications, or clears it.
pub async fn set_device_token(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<DeviceTokenRequest>,
) -> AppResult<StatusCode> {
    let token = req.device_token.filter(|t| !t.trim().is_empty());
    let registered = token.is_some();
    let user_id = user.id.clone();
    state
        .blocking(move |s| Ok(s.store().set_device_token(&user_id, token.as_deref())?))
        .await?;
    info!("User {} {} push device", user.id, if registered { "registered" } else { "cleared" });
    Ok(StatusCode::NO_CONTENT)
}
