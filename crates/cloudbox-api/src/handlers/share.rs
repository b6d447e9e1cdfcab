//! Share link handlers: owner management and public access.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::dto::request::CreateShareRequest;
use crate::dto::response::{ApiResponse, MessageResponse, ShareResponse, SharedFileResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/shares
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateShareRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ShareResponse>>), ApiError> {
    let file = state.file_service.find_owned(req.file_id, auth.id()).await?;
    let link = state
        .share_manager
        .issue(req.file_id, auth.id(), req.expires_in)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ShareResponse::new(
            link,
            &state.config.share.base_url,
            Some(file),
        ))),
    ))
}

/// GET /api/shares
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<ShareResponse>>>, ApiError> {
    let base_url = &state.config.share.base_url;
    let links = state.share_manager.list_active(auth.id()).await?;
    Ok(Json(ApiResponse::ok(
        links
            .into_iter()
            .map(|link| ShareResponse::new(link, base_url, None))
            .collect(),
    )))
}

/// DELETE /api/shares/{token}
pub async fn revoke(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.share_manager.revoke(&token, auth.id()).await?;
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "share link revoked".to_string(),
    })))
}

/// GET /share/{token} (public)
pub async fn access(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<SharedFileResponse>>, ApiError> {
    let shared = state.share_manager.access(&token).await?;
    Ok(Json(ApiResponse::ok(SharedFileResponse {
        file_name: shared.file.name,
        content_type: shared.file.content_type,
        file_size: shared.file.size_bytes,
        download_url: shared.download_url,
        expires_in: shared.url_expires_in.as_secs(),
    })))
}
