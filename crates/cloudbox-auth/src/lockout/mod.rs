//! Failed-login counting and temporary account lockout.

pub mod guard;

pub use guard::{LockoutError, LockoutGuard};
