//! File upload, listing and download handlers.

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use cloudbox_core::error::AppError;

use crate::dto::response::{ApiResponse, DownloadResponse, FileResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/files/upload (multipart field `file`)
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponse>>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(String::from)
            .ok_or_else(|| AppError::validation("file name is required"))?;
        let content_type = field.content_type().map(String::from);
        let data = field.bytes().await.map_err(|e| {
            AppError::validation(format!(
                "failed to read upload (maximum size is {} MB): {e}",
                state.file_service.max_upload_bytes() / (1024 * 1024)
            ))
        })?;

        let file = state
            .file_service
            .upload(auth.id(), &file_name, content_type.as_deref(), data)
            .await?;

        return Ok((
            StatusCode::CREATED,
            Json(ApiResponse::ok(FileResponse::from(file))),
        ));
    }

    Err(AppError::validation("no file uploaded").into())
}

/// GET /api/files/list
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let files = state.file_service.list(auth.id()).await?;
    Ok(Json(ApiResponse::ok(
        files.into_iter().map(FileResponse::from).collect(),
    )))
}

/// GET /api/files/download/{id}
pub async fn download(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DownloadResponse>>, ApiError> {
    let download = state.file_service.download_url(id, auth.id()).await?;
    Ok(Json(ApiResponse::ok(DownloadResponse {
        download_url: download.download_url,
        file_name: download.file.name,
        expires_in: download.expires_in.as_secs(),
    })))
}
