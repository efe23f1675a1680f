use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;
use zap_types::api::Claims;
use zap_types::models::User;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The authenticated requester, loaded fresh for every request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Validates the bearer JWT and loads the user it names. Tokens for users
/// that no longer exist are rejected like bad tokens.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> AppResult<Response> {
    let Authorization(bearer) = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::Unauthenticated)?;

    let claims = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("Rejected token: {}", e);
        AppError::Unauthenticated
    })?
    .claims;

    let user = state
        .blocking(move |s| Ok(s.store().user(&claims.sub)?))
        .await?
        .ok_or(AppError::Unauthenticated)?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
