use axum::{Extension, Json, extract::State};
use chrono::Utc;
use zap_core::feed::FeedAssembler;
use zap_types::api::FeedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub async fn get_feed(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<Json<FeedResponse>> {
    let feed = state
        .blocking(move |s| {
            FeedAssembler::new(s.store(), s.assets(), &s.settings).build(&user, Utc::now())
        })
        .await?;
    Ok(Json(feed))
}
