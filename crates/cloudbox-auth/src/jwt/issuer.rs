//! Access/refresh token pair issuance and verification.
//!
//! Tokens are stateless: nothing is recorded server-side, so a token stays
//! valid until its `exp` regardless of later logins or refreshes.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use cloudbox_core::config::AuthConfig;
use cloudbox_core::error::AppError;
use cloudbox_core::types::Clock;

use super::claims::{TokenClaims, TokenKind};
use super::decoder::JwtDecoder;
use super::encoder::JwtEncoder;

/// Token verification and signing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Not a structurally valid JWT with the expected claims.
    #[error("invalid token format")]
    Malformed,
    /// `exp` is at or before the current time.
    #[error("token has expired")]
    Expired,
    /// Valid token of the other kind.
    #[error("invalid token type: expected {expected} token, found {found} token")]
    WrongKind {
        /// Kind the caller asked for.
        expected: TokenKind,
        /// Kind carried by the token.
        found: TokenKind,
    },
    /// Signature does not verify, or the header names another algorithm.
    #[error("invalid token signature")]
    BadSignature,
    /// Signing failed.
    #[error("failed to sign token: {0}")]
    Encoding(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encoding(_) => AppError::internal(err.to_string()),
            _ => AppError::authentication(err.to_string()),
        }
    }
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedTokens {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Access token expiration. Equal to the signed `exp`.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh token expiration.
    pub refresh_expires_at: DateTime<Utc>,
}

/// Issues and verifies HS256 token pairs.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    /// Signs claims.
    encoder: JwtEncoder,
    /// Verifies signatures.
    decoder: JwtDecoder,
    /// Access token lifetime.
    access_ttl: Duration,
    /// Refresh token lifetime.
    refresh_ttl: Duration,
    /// Time source for `iat`/`exp`.
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    /// Creates an issuer from auth configuration.
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoder: JwtEncoder::new(&config.jwt_secret),
            decoder: JwtDecoder::new(&config.jwt_secret),
            access_ttl: Duration::minutes(config.jwt_access_ttl_minutes as i64),
            refresh_ttl: Duration::hours(config.jwt_refresh_ttl_hours as i64),
            clock,
        }
    }

    /// Access token lifetime.
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Issues a new pair for `subject`. Either both tokens are produced or neither.
    pub fn issue(&self, subject: Uuid) -> Result<IssuedTokens, TokenError> {
        let now = self.clock.now();
        let access_expires_at = now + self.access_ttl;
        let refresh_expires_at = now + self.refresh_ttl;

        let access_token = self.encoder.encode(&TokenClaims {
            sub: subject,
            kind: TokenKind::Access,
            iat: now.timestamp(),
            exp: access_expires_at.timestamp(),
        })?;
        let refresh_token = self.encoder.encode(&TokenClaims {
            sub: subject,
            kind: TokenKind::Refresh,
            iat: now.timestamp(),
            exp: refresh_expires_at.timestamp(),
        })?;

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Verifies `token` as `expected` and returns the subject.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Uuid, TokenError> {
        self.verify_claims(token, expected).map(|claims| claims.sub)
    }

    /// Verifies `token` as `expected` and returns its claims.
    pub fn verify_claims(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, TokenError> {
        let claims = self.decoder.decode(token)?;

        if claims.is_expired_at(self.clock.now()) {
            return Err(TokenError::Expired);
        }
        if claims.kind != expected {
            return Err(TokenError::WrongKind {
                expected,
                found: claims.kind,
            });
        }
        Ok(claims)
    }

    /// Exchanges a valid refresh token for a brand-new pair.
    ///
    /// The presented refresh token is not revoked.
    pub fn refresh(&self, refresh_token: &str) -> Result<IssuedTokens, TokenError> {
        let subject = self.verify(refresh_token, TokenKind::Refresh)?;
        self.issue(subject)
    }
}
