//! # cloudbox-database
//!
//! Persistence for CloudBox. The [`store`] module defines the record
//! lookup/save traits consumed by the auth and service layers; they are
//! implemented by the PostgreSQL repositories in [`repositories`] and by
//! the in-memory stores in [`memory`].

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{AccountStore, FileStore, ShareLinkStore, Stores};
