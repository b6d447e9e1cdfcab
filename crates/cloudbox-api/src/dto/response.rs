//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cloudbox_auth::IssuedTokens;
use cloudbox_entity::account::Account;
use cloudbox_entity::file::FileRecord;
use cloudbox_entity::share::ShareLink;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

/// Token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Access token expiration, equal to the signed `exp`.
    pub expires_at: DateTime<Utc>,
    /// Refresh token expiration.
    pub refresh_expires_at: DateTime<Utc>,
}

impl From<IssuedTokens> for TokenResponse {
    fn from(tokens: IssuedTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        }
    }
}

/// Account summary returned on login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginUserResponse {
    /// Account ID.
    pub id: Uuid,
    /// Username.
    pub username: String,
    /// Time of this login.
    pub last_login: Option<DateTime<Utc>>,
    /// Consecutive failed attempts; zero after a successful login.
    pub login_attempts: i32,
}

impl From<&Account> for LoginUserResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            last_login: account.last_login_at,
            login_attempts: account.failed_login_attempts,
        }
    }
}

/// Login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Issued tokens.
    pub tokens: TokenResponse,
    /// Account info.
    pub user: LoginUserResponse,
}

/// Newly registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredResponse {
    /// Account ID.
    pub id: Uuid,
    /// Username.
    pub username: String,
    /// Email.
    pub email: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<Account> for RegisteredResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            created_at: account.created_at,
        }
    }
}

/// Caller's profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    /// Username.
    pub username: String,
    /// Email.
    pub email: String,
    /// Last successful login.
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&Account> for ProfileResponse {
    fn from(account: &Account) -> Self {
        Self {
            username: account.username.clone(),
            email: account.email.clone(),
            last_login: account.last_login_at,
        }
    }
}

/// File metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResponse {
    /// File ID.
    pub file_id: Uuid,
    /// Original file name.
    pub file_name: String,
    /// Size in bytes.
    pub file_size: i64,
    /// MIME type.
    pub content_type: String,
    /// Upload time.
    pub upload_date: DateTime<Utc>,
}

impl From<FileRecord> for FileResponse {
    fn from(file: FileRecord) -> Self {
        Self {
            file_id: file.id,
            file_name: file.name,
            file_size: file.size_bytes,
            content_type: file.content_type,
            upload_date: file.uploaded_at,
        }
    }
}

/// Presigned download for an owned file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResponse {
    /// Time-limited URL.
    pub download_url: String,
    /// File name.
    pub file_name: String,
    /// URL lifetime in seconds.
    pub expires_in: u64,
}

/// A share link as seen by its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResponse {
    /// Opaque token.
    pub share_token: String,
    /// Public URL resolving the token.
    pub share_url: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
    /// Successful accesses so far.
    pub access_count: i64,
    /// Shared file, when loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileResponse>,
}

impl ShareResponse {
    /// Builds the response for `link` under the public `base_url`.
    pub fn new(link: ShareLink, base_url: &str, file: Option<FileRecord>) -> Self {
        Self {
            share_url: format!("{}/share/{}", base_url.trim_end_matches('/'), link.token),
            share_token: link.token,
            created_at: link.created_at,
            expires_at: link.expires_at,
            access_count: link.access_count,
            file_info: file.map(FileResponse::from),
        }
    }
}

/// Public share resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedFileResponse {
    /// File name.
    pub file_name: String,
    /// MIME type.
    pub content_type: String,
    /// Size in bytes.
    pub file_size: i64,
    /// Time-limited URL.
    pub download_url: String,
    /// URL lifetime in seconds.
    pub expires_in: u64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Object storage provider.
    pub storage: String,
}
