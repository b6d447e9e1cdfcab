//! PostgreSQL repository implementations.

pub mod account;
pub mod file;
pub mod share;

pub use account::AccountRepository;
pub use file::FileRepository;
pub use share::ShareLinkRepository;

use cloudbox_core::error::{AppError, ErrorKind};

/// Map a sqlx error, turning unique-constraint violations into conflicts.
pub(crate) fn map_write_error(context: &str, err: sqlx::Error) -> AppError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique").to_string();
            return AppError::with_source(
                ErrorKind::Conflict,
                format!("{context}: unique constraint '{constraint}' violated"),
                err,
            );
        }
    }
    AppError::with_source(ErrorKind::Database, context.to_string(), err)
}
