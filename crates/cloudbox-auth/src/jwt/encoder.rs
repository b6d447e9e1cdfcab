//! JWT signing.

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};

use super::claims::TokenClaims;
use super::issuer::TokenError;

/// Signs claims with HMAC-SHA256.
#[derive(Clone)]
pub struct JwtEncoder {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// Header naming HS256.
    header: Header,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("alg", &self.header.alg)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates an encoder for `secret`.
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            header: Header::new(Algorithm::HS256),
        }
    }

    /// Serializes and signs `claims`.
    pub fn encode(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&self.header, claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }
}
