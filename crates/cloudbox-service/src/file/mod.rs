//! File upload, listing and owner downloads.

pub mod service;

pub use service::{FileDownload, FileService};
