//! Auth handlers: register, login, refresh.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use validator::Validate;

use cloudbox_core::error::AppError;

use crate::dto::request::{LoginRequest, RefreshRequest, RegisterRequest};
use crate::dto::response::{
    ApiResponse, LoginResponse, LoginUserResponse, RegisteredResponse, TokenResponse,
};
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the refresh token on `/auth/refresh`.
pub const REFRESH_TOKEN_HEADER: &str = "refresh-token";

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisteredResponse>>), ApiError> {
    req.validate().map_err(ApiError::invalid_request)?;

    let account = state
        .account_service
        .register(&req.username, &req.email, &req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(RegisteredResponse::from(account))),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    req.validate().map_err(ApiError::invalid_request)?;

    let outcome = state
        .account_service
        .login(&req.username, &req.password)
        .await?;

    Ok(Json(ApiResponse::ok(LoginResponse {
        user: LoginUserResponse::from(&outcome.account),
        tokens: TokenResponse::from(outcome.tokens),
    })))
}

/// POST /auth/refresh
///
/// The token is read from the `Refresh-Token` header, falling back to a JSON
/// body `{ "refresh_token": ... }`.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let from_header = headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from);

    let token = from_header
        .or_else(|| body.and_then(|Json(req)| req.refresh_token))
        .ok_or_else(|| AppError::authentication("refresh token is required"))?;

    let tokens = state.account_service.refresh(&token).await?;
    Ok(Json(ApiResponse::ok(TokenResponse::from(tokens))))
}
