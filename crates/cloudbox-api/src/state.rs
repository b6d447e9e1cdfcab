//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use cloudbox_core::config::AppConfig;
use cloudbox_core::traits::storage::ObjectStorage;
use cloudbox_service::{AccountService, FileService, ShareLinkManager};
use cloudbox_storage::LocalObjectStorage;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    /// Object storage used by the services
    pub object_storage: Arc<dyn ObjectStorage>,
    /// Local provider, present when `/blobs` URLs must be served
    pub local_storage: Option<Arc<LocalObjectStorage>>,

    // ── Services ─────────────────────────────────────────────
    /// Registration, login, refresh and profile
    pub account_service: Arc<AccountService>,
    /// Uploads and owner downloads
    pub file_service: Arc<FileService>,
    /// Share link lifecycle
    pub share_manager: Arc<ShareLinkManager>,
}
