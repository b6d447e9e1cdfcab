//! # cloudbox-service
//!
//! Use-case services for CloudBox. Each service is built once at startup
//! from `Arc`-shared stores, the object storage provider and the auth
//! components, and is cheap to clone into request handlers and spawned
//! tasks.

pub mod account;
pub mod file;
pub mod share;

#[cfg(test)]
pub(crate) mod testing;

pub use account::{AccountError, AccountService, LoginOutcome};
pub use file::{FileDownload, FileService};
pub use share::{ShareError, ShareLinkManager, ShareSweeper, SharedDownload};
