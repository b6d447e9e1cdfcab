//! Convenience result type alias for CloudBox.

use crate::error::AppError;

/// A specialized `Result` type for CloudBox operations.
pub type AppResult<T> = Result<T, AppError>;
