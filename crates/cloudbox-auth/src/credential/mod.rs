//! Account creation and lookup with uniqueness guarantees.

pub mod store;

pub use store::{CredentialError, CredentialStore};
