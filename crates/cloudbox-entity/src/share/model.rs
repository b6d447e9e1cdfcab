//! Share link entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A capability token granting retrieval of one file.
///
/// Links are never deleted. Revocation and expiry both clear `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShareLink {
    /// Unique share identifier.
    pub id: Uuid,
    /// Public URL-safe token.
    pub token: String,
    /// Shared file.
    pub file_id: Uuid,
    /// Account that created the link.
    pub owner_id: Uuid,
    /// When the link was created.
    pub created_at: DateTime<Utc>,
    /// Instant from which the link no longer grants access.
    pub expires_at: DateTime<Utc>,
    /// Cleared on revocation or once expiry has been observed.
    pub is_active: bool,
    /// Number of successful accesses.
    pub access_count: i64,
}

impl ShareLink {
    /// Whether `now` is at or past the expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the link grants access at `now`.
    pub fn grants_access_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now)
    }

    /// Whether `account_id` created this link.
    pub fn is_owned_by(&self, account_id: Uuid) -> bool {
        self.owner_id == account_id
    }
}

/// Data required to create a new share link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShareLink {
    /// Generated token.
    pub token: String,
    /// Shared file.
    pub file_id: Uuid,
    /// Creating account.
    pub owner_id: Uuid,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
}
