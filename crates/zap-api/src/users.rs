use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::Response,
};
use zap_core::profiles::ProfileService;
use zap_types::api::{Author, HandleQuery};

use crate::error::{AppError, AppResult};
use crate::found;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub async fn find_user(
    State(state): State<AppState>,
    Query(query): Query<HandleQuery>,
) -> AppResult<Json<Author>> {
    let handle = query
        .handle
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AppError::BadRequest("handle is required".into()))?;
    let author = state
        .blocking(move |s| ProfileService::new(s.store(), s.assets(), &s.settings).user_by_handle(&handle))
        .await?;
    Ok(Json(author))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Author>> {
    let author = state
        .blocking(move |s| ProfileService::new(s.store(), s.assets(), &s.settings).user(&id))
        .await?;
    Ok(Json(author))
}

pub async fn profile_picture(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let url = state
        .blocking(move |s| {
            ProfileService::new(s.store(), s.assets(), &s.settings).profile_picture(&user.id, &id)
        })
        .await?;
    Ok(found(url))
}
