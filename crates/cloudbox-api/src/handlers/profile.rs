//! Profile handler.

use axum::Json;

use crate::dto::response::{ApiResponse, ProfileResponse};
use crate::extractors::AuthUser;

/// GET /api/profile
pub async fn profile(auth: AuthUser) -> Json<ApiResponse<ProfileResponse>> {
    Json(ApiResponse::ok(ProfileResponse::from(&auth.0)))
}
