//! Account entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    /// Unique account identifier.
    pub id: Uuid,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Argon2id password hash (PHC string).
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Number of consecutive failed login attempts.
    pub failed_login_attempts: i32,
    /// Account locked until this time (if locked).
    pub locked_until: Option<DateTime<Utc>>,
    /// Last successful login time.
    pub last_login_at: Option<DateTime<Utc>>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build a fresh account row from registration data.
    pub fn from_new(new: NewAccount, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            failed_login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a lock is in force at `now`.
    ///
    /// A `locked_until` in the past carries no meaning.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Count one failed login at `now`.
    ///
    /// A lapsed lock restarts the count at 1. Reaching `max_attempts` sets
    /// `locked_until` to `lock_until`. Stores apply the same transition
    /// atomically and only to accounts not locked at `now`.
    pub fn apply_failed_login(
        &mut self,
        now: DateTime<Utc>,
        max_attempts: i32,
        lock_until: DateTime<Utc>,
    ) {
        if self.locked_until.is_some() {
            self.failed_login_attempts = 0;
            self.locked_until = None;
        }
        self.failed_login_attempts = self.failed_login_attempts.saturating_add(1);
        if self.failed_login_attempts >= max_attempts {
            self.locked_until = Some(lock_until);
        }
        self.updated_at = now;
    }

    /// Clear the lockout state after a successful login at `now`.
    pub fn apply_successful_login(&mut self, now: DateTime<Utc>) {
        self.failed_login_attempts = 0;
        self.locked_until = None;
        self.last_login_at = Some(now);
        self.updated_at = now;
    }
}

/// Data required to create a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    /// Desired username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Pre-hashed password.
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn account() -> Account {
        Account::from_new(
            NewAccount {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: "$argon2id$stub".into(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_lock_only_meaningful_in_future() {
        let now = Utc::now();
        let mut acc = account();
        assert!(!acc.is_locked_at(now));

        acc.locked_until = Some(now + Duration::minutes(15));
        assert!(acc.is_locked_at(now));

        acc.locked_until = Some(now - Duration::seconds(1));
        assert!(!acc.is_locked_at(now));
    }

    #[test]
    fn test_failed_login_after_lapsed_lock_restarts_count() {
        let now = Utc::now();
        let mut acc = account();
        acc.failed_login_attempts = 5;
        acc.locked_until = Some(now - Duration::seconds(1));

        acc.apply_failed_login(now, 5, now + Duration::minutes(15));
        assert_eq!(acc.failed_login_attempts, 1);
        assert_eq!(acc.locked_until, None);

        for _ in 0..4 {
            acc.apply_failed_login(now, 5, now + Duration::minutes(15));
        }
        assert_eq!(acc.failed_login_attempts, 5);
        assert_eq!(acc.locked_until, Some(now + Duration::minutes(15)));
    }

    #[test]
    fn test_hash_never_serialized() {
        let json = serde_json::to_string(&account()).unwrap();
        assert!(!json.contains("password_hash"));
    }
}
