//! # cloudbox-storage
//!
//! Object storage providers for CloudBox. The local filesystem provider is
//! always available and serves downloads through HMAC-signed URLs; the S3
//! provider is compiled with the `s3` feature and uses native presigning.

pub mod manager;
pub mod providers;

pub use manager::{StorageHandles, build_object_storage};
pub use providers::LocalObjectStorage;
