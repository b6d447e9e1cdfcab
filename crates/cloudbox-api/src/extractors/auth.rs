//! `AuthUser` extractor: pulls the access token from the Authorization header
//! and resolves it to an account.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use cloudbox_core::error::AppError;
use cloudbox_entity::account::Account;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Account);

impl AuthUser {
    /// The caller's account id.
    pub fn id(&self) -> Uuid {
        self.0.id
    }
}

impl std::ops::Deref for AuthUser {
    type Target = Account;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Returns the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authentication("missing authorization header"))?;

        let token = bearer_token(auth_header)
            .ok_or_else(|| AppError::authentication("invalid authorization header format"))?;

        let account = state.account_service.authenticate(token).await?;
        Ok(AuthUser(account))
    }
}
