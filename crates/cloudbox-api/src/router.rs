//! Route definitions for the CloudBox HTTP API.
//!
//! Authentication endpoints live under `/auth`, authenticated resources under
//! `/api`, and the public share and blob endpoints at the top level.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::middleware::cors::build_cors_layer;
use crate::state::AppState;

/// Room for multipart framing on top of the upload limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.file_service.max_upload_bytes() as usize + MULTIPART_OVERHEAD_BYTES;
    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
        .merge(public_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Registration, login and token refresh.
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
}

/// Endpoints requiring an access token.
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(handlers::profile::profile))
        .route("/files/upload", post(handlers::file::upload))
        .route("/files/list", get(handlers::file::list))
        .route("/files/download/{id}", get(handlers::file::download))
        .route(
            "/shares",
            post(handlers::share::create).get(handlers::share::list),
        )
        .route("/shares/{token}", delete(handlers::share::revoke))
}

/// Unauthenticated endpoints.
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/share/{token}", get(handlers::share::access))
        .route("/blobs/{*key}", get(handlers::blob::download))
}
