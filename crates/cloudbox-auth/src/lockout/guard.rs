//! Lockout decisions for login attempts.
//!
//! The guard never touches storage. It supplies the limits that the
//! account store applies atomically and interprets the stored result.
//! [`LockoutGuard::serialize`] additionally orders attempts within one
//! process.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use cloudbox_core::config::AuthConfig;
use cloudbox_core::error::AppError;
use cloudbox_core::types::KeyedLocks;
use cloudbox_entity::account::Account;

/// Outcome of a refused login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockoutError {
    /// Unknown user or wrong password.
    #[error("invalid username or password")]
    InvalidCredentials,
    /// The account was already locked when the attempt arrived.
    #[error("account is locked. Try again after {until}")]
    Locked {
        /// When the lock lapses.
        until: DateTime<Utc>,
    },
    /// This attempt crossed the threshold and locked the account.
    #[error("account locked due to too many failed attempts. Try again after {until}")]
    LockedNow {
        /// When the lock lapses.
        until: DateTime<Utc>,
    },
}

impl LockoutError {
    /// Lock expiry, if this error represents a lock.
    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Locked { until } | Self::LockedNow { until } => Some(*until),
            Self::InvalidCredentials => None,
        }
    }
}

impl From<LockoutError> for AppError {
    fn from(err: LockoutError) -> Self {
        match err {
            LockoutError::InvalidCredentials => AppError::authentication(err.to_string()),
            LockoutError::Locked { .. } | LockoutError::LockedNow { .. } => {
                AppError::rate_limit(err.to_string())
            }
        }
    }
}

/// Counts consecutive failures and locks accounts that exceed the limit.
#[derive(Debug)]
pub struct LockoutGuard {
    /// Failures that trigger a lock.
    max_attempts: u32,
    /// How long a lock lasts.
    lockout_duration: Duration,
    /// Per-account serialization of login attempts.
    locks: KeyedLocks<Uuid>,
}

impl LockoutGuard {
    /// Create a guard from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_limits(
            config.max_failed_attempts,
            Duration::minutes(config.lockout_duration_minutes as i64),
        )
    }

    /// Create a guard with explicit limits.
    pub fn with_limits(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lockout_duration,
            locks: KeyedLocks::new(),
        }
    }

    /// Wait for exclusive access to `account_id`'s lockout state.
    pub async fn serialize(&self, account_id: Uuid) -> OwnedMutexGuard<()> {
        self.locks.lock(account_id).await
    }

    /// Refuse the attempt outright if a lock is in force at `now`.
    pub fn check(&self, account: &Account, now: DateTime<Utc>) -> Result<(), LockoutError> {
        match account.locked_until {
            Some(until) if account.is_locked_at(now) => Err(LockoutError::Locked { until }),
            _ => Ok(()),
        }
    }

    /// Failures that trigger a lock, as stored.
    pub fn max_attempts(&self) -> i32 {
        i32::try_from(self.max_attempts).unwrap_or(i32::MAX)
    }

    /// Lock expiry for a lock imposed at `now`.
    pub fn lock_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.lockout_duration
    }

    /// Interpret an account just updated by a counted failure at `now`.
    ///
    /// Stores refuse to count against a locked account, so a lock on the
    /// returned row was imposed by this very failure.
    pub fn classify_failure(&self, updated: &Account, now: DateTime<Utc>) -> LockoutError {
        match updated.locked_until {
            Some(until) if updated.is_locked_at(now) => LockoutError::LockedNow { until },
            _ => LockoutError::InvalidCredentials,
        }
    }

    /// Count a failed attempt and decide whether it locks the account.
    ///
    /// Call only after [`check`](Self::check) passed. A lapsed lock restarts
    /// the count, so the first failure after it is 1.
    pub fn record_failure(&self, account: &mut Account, now: DateTime<Utc>) -> LockoutError {
        account.apply_failed_login(now, self.max_attempts(), self.lock_expiry(now));
        self.classify_failure(account, now)
    }

    /// Clear the failure state after a successful login.
    pub fn record_success(&self, account: &mut Account, now: DateTime<Utc>) {
        account.apply_successful_login(now);
    }
}

impl Default for LockoutGuard {
    fn default() -> Self {
        Self::new(&AuthConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use cloudbox_entity::account::NewAccount;

    use super::*;

    fn account(now: DateTime<Utc>) -> Account {
        Account::from_new(
            NewAccount {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: "hash".into(),
            },
            now,
        )
    }

    #[test]
    fn test_fifth_failure_locks() {
        let guard = LockoutGuard::default();
        let now = Utc::now();
        let mut acc = account(now);

        for attempt in 1..=4 {
            assert_eq!(
                guard.record_failure(&mut acc, now),
                LockoutError::InvalidCredentials
            );
            assert_eq!(acc.failed_login_attempts, attempt);
            assert!(guard.check(&acc, now).is_ok());
        }

        let err = guard.record_failure(&mut acc, now);
        let until = now + Duration::minutes(15);
        assert_eq!(err, LockoutError::LockedNow { until });
        assert_eq!(acc.locked_until, Some(until));
        assert_eq!(guard.check(&acc, now), Err(LockoutError::Locked { until }));
    }

    #[test]
    fn test_lock_lapses_and_count_restarts() {
        let guard = LockoutGuard::default();
        let now = Utc::now();
        let mut acc = account(now);
        for _ in 0..5 {
            guard.record_failure(&mut acc, now);
        }

        let later = now + Duration::minutes(15);
        assert!(guard.check(&acc, later - Duration::seconds(1)).is_err());
        assert!(guard.check(&acc, later).is_ok());

        assert_eq!(
            guard.record_failure(&mut acc, later),
            LockoutError::InvalidCredentials
        );
        assert_eq!(acc.failed_login_attempts, 1);
        assert_eq!(acc.locked_until, None);
    }

    #[test]
    fn test_success_resets_state() {
        let guard = LockoutGuard::default();
        let now = Utc::now();
        let mut acc = account(now);
        guard.record_failure(&mut acc, now);
        guard.record_failure(&mut acc, now);

        guard.record_success(&mut acc, now);
        assert_eq!(acc.failed_login_attempts, 0);
        assert_eq!(acc.locked_until, None);
        assert_eq!(acc.last_login_at, Some(now));
    }

    #[test]
    fn test_lock_errors_map_to_rate_limit() {
        let until = Utc::now();
        let err: AppError = LockoutError::LockedNow { until }.into();
        assert_eq!(err.kind, cloudbox_core::error::ErrorKind::RateLimit);
        assert!(err.message.starts_with("account locked due to too many failed attempts"));

        let err: AppError = LockoutError::InvalidCredentials.into();
        assert_eq!(err.kind, cloudbox_core::error::ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_serialize_is_per_account() {
        let guard = LockoutGuard::default();
        let a = guard.serialize(Uuid::new_v4()).await;
        let b = guard.serialize(Uuid::new_v4()).await;
        drop((a, b));
    }
}
