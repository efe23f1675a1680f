use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use zap_core::error::CoreError;
use zap_core::invites;
use zap_types::api::ServerInfo;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn info(State(state): State<AppState>) -> Json<ServerInfo> {
    Json(ServerInfo {
        endpoint: state.config.public_url.clone(),
        name: "DailyZap".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        region: state.config.region,
    })
}

/// Landing page for shared invite links: hands the code to the app.
pub async fn invite_landing(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Response> {
    let lookup = code.clone();
    match state.blocking(move |s| invites::resolve(s.store(), &lookup)).await {
        Ok(_) => {
            let link = invites::deep_link(state.config.public_host(), &code);
            Ok(Html(format!("<a href='{}'>Click here to register</a>", link)).into_response())
        }
        Err(AppError::Core(CoreError::NotFound { .. })) => {
            Ok((StatusCode::NOT_FOUND, "Invite not found").into_response())
        }
        Err(e) => Err(e),
    }
}
