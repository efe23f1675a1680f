//! Serves and accepts blobs behind presigned URLs. No session is involved:
//! the URL signature is the credential.

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};
use zap_core::assets::Bucket;
use zap_core::error::CoreError;
use zap_storage::{Access, SignatureError};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

pub async fn download(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    Query(query): Query<SignedQuery>,
) -> AppResult<Response> {
    let bucket = authorize(&state, Access::Read, &bucket, &key, &query)?;
    let data = state
        .blobs
        .read(bucket, &key)
        .await?
        .ok_or_else(|| CoreError::not_found("blob", format!("{}/{}", bucket, key)))?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], data).into_response())
}

pub async fn upload(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    Query(query): Query<SignedQuery>,
    body: Bytes,
) -> AppResult<StatusCode> {
    let bucket = authorize(&state, Access::Write, &bucket, &key, &query)?;
    if body.is_empty() {
        return Err(AppError::BadRequest("empty upload".into()));
    }
    let size = body.len();
    state.blobs.write(bucket, &key, body).await?;
    info!("Upload complete: {}/{} ({} bytes)", bucket, key, size);
    Ok(StatusCode::NO_CONTENT)
}

fn authorize(
    state: &AppState,
    access: Access,
    bucket: &str,
    key: &str,
    query: &SignedQuery,
) -> AppResult<Bucket> {
    let bucket: Bucket = bucket
        .parse()
        .map_err(|_| CoreError::not_found("bucket", bucket))?;
    state
        .blobs
        .object_path(bucket, key)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    state
        .blobs
        .verify(access, bucket, key, query.expires, &query.signature, Utc::now())
        .map_err(|e| {
            debug!("Blob {}/{} refused: {}", bucket, key, e);
            match e {
                SignatureError::Invalid => AppError::Unauthenticated,
                SignatureError::Expired => {
                    CoreError::PreconditionFailed("URL expired".into()).into()
                }
            }
        })?;
    Ok(bucket)
}
