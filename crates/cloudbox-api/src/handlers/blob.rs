//! Signed blob downloads for the local storage provider.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use serde::Deserialize;

use cloudbox_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters of a presigned local URL.
#[derive(Debug, Deserialize)]
pub struct BlobQuery {
    /// Unix expiry timestamp.
    pub expires: i64,
    /// URL-safe base64 HMAC signature.
    pub signature: String,
}

/// GET /blobs/{*key}?expires=&signature=
pub async fn download(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<BlobQuery>,
) -> Result<Response, ApiError> {
    let local = state
        .local_storage
        .as_ref()
        .ok_or_else(|| AppError::not_found("blob downloads are not served by this provider"))?;

    local.verify_download(&key, query.expires, &query.signature)?;
    let (stream, len) = local.open_object(&key).await?;

    let content_type = mime_guess::from_path(&key).first_or_octet_stream();
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.essence_str())
        .header(header::CONTENT_LENGTH, len)
        .header(header::CACHE_CONTROL, "private, no-store")
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))?;

    Ok(response)
}
