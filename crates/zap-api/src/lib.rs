//! HTTP adapter: authenticates requests, runs core operations on the
//! blocking pool and maps their outcomes to responses.

pub mod blobs;
pub mod config;
pub mod error;
pub mod feed;
pub mod friends;
pub mod info;
pub mod middleware;
pub mod notifications;
pub mod profile;
pub mod reactions;
pub mod router;
pub mod state;
pub mod users;
pub mod zaps;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

/// 302 to a presigned URL. Clients follow it to fetch the image itself.
pub(crate) fn found(url: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url)]).into_response()
}
