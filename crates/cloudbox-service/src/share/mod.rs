//! Share link issuance, resolution, revocation and expiry sweeping.

pub mod link;
pub mod manager;
pub mod sweeper;

pub use link::generate_token;
pub use manager::{ShareError, ShareLinkManager, SharedDownload};
pub use sweeper::ShareSweeper;
