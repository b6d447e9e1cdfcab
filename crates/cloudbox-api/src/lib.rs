//! # cloudbox-api
//!
//! HTTP API layer for CloudBox built on Axum.
//!
//! Provides the REST endpoints, middleware (CORS, request logging), the
//! bearer-token extractor, DTOs, and error-to-status mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, build_state};
pub use error::ApiError;
pub use state::AppState;
