//! Share link entities.

pub mod model;

pub use model::{NewShareLink, ShareLink};
