//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! `config/default.toml`, an environment overlay, and `CLOUDBOX__*`
//! environment variables. Each sub-module represents a logical section.

pub mod app;
pub mod auth;
pub mod database;
pub mod logging;
pub mod share;
pub mod storage;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::auth::AuthConfig;
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::share::ShareConfig;
pub use self::storage::{LocalStorageConfig, S3StorageConfig, StorageConfig};

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Object storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Share link settings.
    #[serde(default)]
    pub share: ShareConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the given environment name.
    ///
    /// Merges `config/default`, `config/{env}` and environment variables
    /// prefixed with `CLOUDBOX__` (sections separated by `__`).
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CLOUDBOX")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate(env)?;
        Ok(config)
    }

    /// Reject configurations that are unsafe or internally inconsistent.
    pub fn validate(&self, env: &str) -> Result<(), AppError> {
        if env != "development" && self.auth.uses_placeholder_secret() {
            return Err(AppError::configuration(
                "auth.jwt_secret must be set outside the development environment",
            ));
        }
        if self.auth.password_min_length > self.auth.password_max_length {
            return Err(AppError::configuration(
                "auth.password_min_length exceeds auth.password_max_length",
            ));
        }
        if self.auth.max_failed_attempts == 0 {
            return Err(AppError::configuration(
                "auth.max_failed_attempts must be at least 1",
            ));
        }
        match self.storage.provider.as_str() {
            "local" | "s3" => Ok(()),
            other => Err(AppError::configuration(format!(
                "Unknown storage provider '{other}'. Expected one of: local, s3"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid_in_development() {
        let config = AppConfig::default();
        assert!(config.validate("development").is_ok());
    }

    #[test]
    fn test_placeholder_secret_rejected_in_production() {
        let config = AppConfig::default();
        let err = config.validate("production").unwrap_err();
        assert!(err.message.contains("jwt_secret"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = AppConfig::default();
        config.storage.provider = "ftp".to_string();
        assert!(config.validate("development").is_err());
    }
}
