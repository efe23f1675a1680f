use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use zap_core::error::CoreError;

/// Error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds the few failures that only
/// exist at the HTTP edge. Renders as `{"error": ..., "code": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing, malformed or expired credentials.
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::NoActiveMoment(region) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("No active moment for region {region}"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "Unauthorized".to_string(),
                ),
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::PreconditionFailed(msg) => (
                    StatusCode::PRECONDITION_FAILED,
                    "PRECONDITION_FAILED",
                    msg.clone(),
                ),
                CoreError::Internal(err) => {
                    tracing::error!(error = %err, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Unauthorized".to_string(),
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Core(CoreError::Internal(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn core_errors_map_to_statuses() {
        assert_eq!(status(CoreError::not_found("zap", "z")), StatusCode::NOT_FOUND);
        assert_eq!(
            status(CoreError::NoActiveMoment(zap_types::models::Region::Eu)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status(CoreError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status(CoreError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status(CoreError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status(CoreError::PreconditionFailed("x".into())),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(status(CoreError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(anyhow::anyhow!("disk on fire")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
