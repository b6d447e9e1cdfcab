//! # cloudbox-auth
//!
//! Credential lifecycle for CloudBox.
//!
//! ## Modules
//!
//! - `password`: password policy and Argon2id hashing
//! - `credential`: account creation with uniqueness guarantees
//! - `lockout`: failed-login counting and temporary lockout
//! - `jwt`: access/refresh token issuance and verification

pub mod credential;
pub mod jwt;
pub mod lockout;
pub mod password;

pub use credential::{CredentialError, CredentialStore};
pub use jwt::{IssuedTokens, TokenClaims, TokenError, TokenIssuer, TokenKind};
pub use lockout::{LockoutError, LockoutGuard};
pub use password::{PasswordHasher, PasswordPolicy, PolicyError, PolicyViolation};
