//! JWT token encoding, decoding, and issuance.

pub mod claims;
pub mod decoder;
pub mod encoder;
pub mod issuer;

pub use claims::{TokenClaims, TokenKind};
pub use decoder::JwtDecoder;
pub use encoder::JwtEncoder;
pub use issuer::{IssuedTokens, TokenError, TokenIssuer};
