//! Password policy enforcement for new passwords.
//!
//! A password is acceptable iff its byte length lies within the configured
//! bounds and it contains at least one ASCII lowercase letter, one ASCII
//! uppercase letter, one ASCII digit and one of `!@#$%^&*`.

use thiserror::Error;

use cloudbox_core::config::AuthConfig;
use cloudbox_core::error::AppError;

/// Characters accepted as the required special character.
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*";

/// A single violated password constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    /// Shorter than the minimum length.
    #[error("password must be at least {min} bytes long")]
    TooShort {
        /// Minimum length in bytes.
        min: usize,
    },
    /// Longer than the maximum length.
    #[error("password must be at most {max} bytes long")]
    TooLong {
        /// Maximum length in bytes.
        max: usize,
    },
    /// No ASCII lowercase letter.
    #[error("password must contain at least one lowercase letter")]
    MissingLowercase,
    /// No ASCII uppercase letter.
    #[error("password must contain at least one uppercase letter")]
    MissingUppercase,
    /// No ASCII digit.
    #[error("password must contain at least one digit")]
    MissingDigit,
    /// None of the accepted special characters.
    #[error("password must contain at least one special character (!@#$%^&*)")]
    MissingSpecial,
}

/// Every constraint a rejected password violates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_messages(.violations))]
pub struct PolicyError {
    /// Violations in a stable order: length first, then character classes.
    pub violations: Vec<PolicyViolation>,
}

impl PolicyError {
    /// Whether the password was below the minimum length.
    pub fn is_too_short(&self) -> bool {
        self.violations
            .iter()
            .any(|v| matches!(v, PolicyViolation::TooShort { .. }))
    }

    /// Whether the password exceeded the maximum length.
    pub fn is_too_long(&self) -> bool {
        self.violations
            .iter()
            .any(|v| matches!(v, PolicyViolation::TooLong { .. }))
    }

    /// Whether a required character class was absent.
    pub fn is_missing_class(&self) -> bool {
        self.violations.iter().any(|v| {
            matches!(
                v,
                PolicyViolation::MissingLowercase
                    | PolicyViolation::MissingUppercase
                    | PolicyViolation::MissingDigit
                    | PolicyViolation::MissingSpecial
            )
        })
    }
}

fn join_messages(violations: &[PolicyViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<PolicyError> for AppError {
    fn from(err: PolicyError) -> Self {
        AppError::validation(err.to_string())
    }
}

/// Validates password strength against configured bounds.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    /// Minimum length in bytes.
    min_length: usize,
    /// Maximum length in bytes.
    max_length: usize,
}

impl PasswordPolicy {
    /// Creates a policy from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_bounds(config.password_min_length, config.password_max_length)
    }

    /// Creates a policy with explicit byte-length bounds.
    pub fn with_bounds(min_length: usize, max_length: usize) -> Self {
        Self {
            min_length,
            max_length,
        }
    }

    /// Checks every constraint and reports all violations together.
    pub fn validate(&self, password: &str) -> Result<(), PolicyError> {
        let mut violations = Vec::new();

        let len = password.len();
        if len < self.min_length {
            violations.push(PolicyViolation::TooShort {
                min: self.min_length,
            });
        }
        if len > self.max_length {
            violations.push(PolicyViolation::TooLong {
                max: self.max_length,
            });
        }

        let bytes = password.as_bytes();
        if !bytes.iter().any(u8::is_ascii_lowercase) {
            violations.push(PolicyViolation::MissingLowercase);
        }
        if !bytes.iter().any(u8::is_ascii_uppercase) {
            violations.push(PolicyViolation::MissingUppercase);
        }
        if !bytes.iter().any(u8::is_ascii_digit) {
            violations.push(PolicyViolation::MissingDigit);
        }
        if !bytes.iter().any(|b| SPECIAL_CHARACTERS.as_bytes().contains(b)) {
            violations.push(PolicyViolation::MissingSpecial);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(PolicyError { violations })
        }
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(&AuthConfig::default())
    }
}
