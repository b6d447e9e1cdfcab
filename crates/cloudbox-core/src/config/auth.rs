//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Placeholder secret shipped in the defaults. Refused outside development.
pub const PLACEHOLDER_JWT_SECRET: &str = "CHANGE_ME_IN_PRODUCTION";

/// Authentication and credential configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub jwt_access_ttl_minutes: u64,
    /// Refresh token TTL in hours.
    #[serde(default = "default_refresh_ttl")]
    pub jwt_refresh_ttl_hours: u64,
    /// Minimum password length in bytes.
    #[serde(default = "default_password_min")]
    pub password_min_length: usize,
    /// Maximum password length in bytes.
    #[serde(default = "default_password_max")]
    pub password_max_length: usize,
    /// Minimum username length in characters.
    #[serde(default = "default_username_min")]
    pub username_min_length: usize,
    /// Maximum username length in characters.
    #[serde(default = "default_username_max")]
    pub username_max_length: usize,
    /// Maximum failed login attempts before lockout.
    #[serde(default = "default_max_failed")]
    pub max_failed_attempts: u32,
    /// Account lockout duration in minutes.
    #[serde(default = "default_lockout")]
    pub lockout_duration_minutes: u64,
}

impl AuthConfig {
    /// Whether the configured secret is still the shipped placeholder.
    pub fn uses_placeholder_secret(&self) -> bool {
        self.jwt_secret == PLACEHOLDER_JWT_SECRET || self.jwt_secret.is_empty()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_access_ttl_minutes: default_access_ttl(),
            jwt_refresh_ttl_hours: default_refresh_ttl(),
            password_min_length: default_password_min(),
            password_max_length: default_password_max(),
            username_min_length: default_username_min(),
            username_max_length: default_username_max(),
            max_failed_attempts: default_max_failed(),
            lockout_duration_minutes: default_lockout(),
        }
    }
}

fn default_jwt_secret() -> String {
    PLACEHOLDER_JWT_SECRET.to_string()
}

fn default_access_ttl() -> u64 {
    15
}

fn default_refresh_ttl() -> u64 {
    7 * 24
}

fn default_password_min() -> usize {
    8
}

fn default_password_max() -> usize {
    72
}

fn default_username_min() -> usize {
    3
}

fn default_username_max() -> usize {
    30
}

fn default_max_failed() -> u32 {
    5
}

fn default_lockout() -> u64 {
    15
}
