//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Registration request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Username.
    #[validate(length(min = 3, max = 30, message = "username must be between 3 and 30 characters"))]
    pub username: String,
    /// Password. Character classes are checked by the password policy.
    #[validate(length(min = 8, max = 72, message = "password must be between 8 and 72 characters"))]
    pub password: String,
    /// Email.
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
}

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username.
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    /// Password.
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Token refresh request body, used when the `Refresh-Token` header is absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Share link creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShareRequest {
    /// File to share.
    pub file_id: Uuid,
    /// Lifetime in hours; absent or zero means effectively non-expiring.
    #[serde(default)]
    pub expires_in: Option<u32>,
}
