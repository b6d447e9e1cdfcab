//! # cloudbox-entity
//!
//! Domain entity models for CloudBox. Every struct in this crate represents
//! a database table row or the data needed to create one. Row types derive
//! `sqlx::FromRow` in addition to `Debug`, `Clone`, `Serialize` and
//! `Deserialize`.

pub mod account;
pub mod file;
pub mod share;
