//! Application builder: wires services into state and state into the router.

use std::sync::Arc;

use axum::Router;

use cloudbox_auth::{CredentialStore, TokenIssuer};
use cloudbox_core::config::AppConfig;
use cloudbox_core::types::Clock;
use cloudbox_database::store::Stores;
use cloudbox_service::{AccountService, FileService, ShareLinkManager};
use cloudbox_storage::StorageHandles;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the shared state from already-constructed collaborators.
pub fn build_state(
    config: AppConfig,
    stores: &Stores,
    storage: StorageHandles,
    clock: Arc<dyn Clock>,
) -> AppState {
    let credentials = CredentialStore::new(Arc::clone(&stores.accounts), Arc::clone(&clock));
    let tokens = Arc::new(TokenIssuer::new(&config.auth, Arc::clone(&clock)));

    let account_service = Arc::new(AccountService::new(
        &config.auth,
        credentials,
        tokens,
        Arc::clone(&clock),
    ));
    let file_service = Arc::new(FileService::new(
        &config.storage,
        Arc::clone(&stores.files),
        Arc::clone(&storage.object_storage),
        Arc::clone(&clock),
    ));
    let share_manager = Arc::new(ShareLinkManager::new(
        &config.share,
        &config.storage,
        Arc::clone(&stores.shares),
        Arc::clone(&stores.files),
        Arc::clone(&storage.object_storage),
        clock,
    ));

    AppState {
        config: Arc::new(config),
        object_storage: storage.object_storage,
        local_storage: storage.local,
        account_service,
        file_service,
        share_manager,
    }
}

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}
