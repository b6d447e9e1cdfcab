//! Registration, login, token refresh and authentication.

pub mod service;

pub use service::{AccountError, AccountService, LoginOutcome};
