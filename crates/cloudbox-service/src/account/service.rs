//! Account service: the credential and session lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use cloudbox_auth::{
    CredentialError, CredentialStore, IssuedTokens, LockoutError, LockoutGuard, PasswordHasher,
    PasswordPolicy, PolicyError, TokenError, TokenIssuer, TokenKind,
};
use cloudbox_core::config::AuthConfig;
use cloudbox_core::error::AppError;
use cloudbox_core::types::Clock;
use cloudbox_entity::account::Account;

/// Failures surfaced by account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The password does not satisfy the policy.
    #[error(transparent)]
    Policy(#[from] PolicyError),
    /// The username is outside the accepted length or contains whitespace.
    #[error("{0}")]
    InvalidUsername(String),
    /// The email address is unusable.
    #[error("{0}")]
    InvalidEmail(String),
    /// Duplicate username/email or a store failure.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// Refused login attempt.
    #[error(transparent)]
    Lockout(#[from] LockoutError),
    /// Token rejected or could not be signed.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// A verified token names an account that no longer exists.
    #[error("account no longer exists")]
    AccountNotFound,
    /// Collaborator failure.
    #[error(transparent)]
    Internal(#[from] AppError),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Policy(e) => e.into(),
            AccountError::InvalidUsername(msg) | AccountError::InvalidEmail(msg) => {
                AppError::validation(msg)
            }
            AccountError::Credential(e) => e.into(),
            AccountError::Lockout(e) => e.into(),
            AccountError::Token(e) => e.into(),
            AccountError::AccountNotFound => AppError::authentication(err.to_string()),
            AccountError::Internal(e) => e,
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The account after its lockout state was reset.
    pub account: Account,
    /// Freshly issued token pair.
    pub tokens: IssuedTokens,
}

/// Orchestrates policy, credential storage, lockout and token issuance.
#[derive(Debug, Clone)]
pub struct AccountService {
    /// Account persistence.
    credentials: CredentialStore,
    /// Password policy for registration.
    policy: PasswordPolicy,
    /// Argon2id hasher.
    hasher: PasswordHasher,
    /// Lockout decisions and per-account serialization.
    lockout: Arc<LockoutGuard>,
    /// Token issuance.
    tokens: Arc<TokenIssuer>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Accepted username length in characters.
    username_bounds: (usize, usize),
}

impl AccountService {
    /// Creates the service.
    pub fn new(
        config: &AuthConfig,
        credentials: CredentialStore,
        tokens: Arc<TokenIssuer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            credentials,
            policy: PasswordPolicy::new(config),
            hasher: PasswordHasher::new(),
            lockout: Arc::new(LockoutGuard::new(config)),
            tokens,
            clock,
            username_bounds: (config.username_min_length, config.username_max_length),
        }
    }

    /// Token issuer shared with the HTTP layer.
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Registers a new account after enforcing the password policy.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Account, AccountError> {
        self.validate_username(username)?;
        if email.trim().is_empty() || !email.contains('@') {
            return Err(AccountError::InvalidEmail("invalid email address".into()));
        }
        self.policy.validate(password)?;

        let hash = self.hash(password).await?;
        let account = self.credentials.create(username, email, hash).await?;

        info!(
            user_id = %account.id,
            username = %account.username,
            "Account registered"
        );
        Ok(account)
    }

    /// Authenticates with username and password and issues a token pair.
    ///
    /// Attempts against one account are serialized. The decision and its
    /// single write run on a spawned task so that a dropped request cannot
    /// leave the counter half-updated.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AccountError> {
        let Some(account) = self.credentials.find_by_username(username).await? else {
            warn!(username = %username, "Login failed: unknown user");
            return Err(LockoutError::InvalidCredentials.into());
        };

        let this = self.clone();
        let password = password.to_string();
        tokio::spawn(async move { this.attempt_login(account.id, password).await })
            .await
            .map_err(|e| AppError::internal(format!("Login task failed: {e}")))?
    }

    async fn attempt_login(
        &self,
        account_id: Uuid,
        password: String,
    ) -> Result<LoginOutcome, AccountError> {
        let _serialized = self.lockout.serialize(account_id).await;

        let account = self
            .credentials
            .find_by_id(account_id)
            .await?
            .ok_or(LockoutError::InvalidCredentials)?;

        let now = self.clock.now();
        if let Err(e) = self.lockout.check(&account, now) {
            warn!(user_id = %account.id, "Login refused: account locked");
            return Err(e.into());
        }

        if !self.verify(password, account.password_hash.clone()).await? {
            let Some(updated) = self
                .credentials
                .record_failed_login(account_id, &self.lockout, now)
                .await?
            else {
                return Err(self.refusal_after_race(account_id, now).await);
            };

            let refusal = self.lockout.classify_failure(&updated, now);
            match &refusal {
                LockoutError::LockedNow { until } => warn!(
                    user_id = %updated.id,
                    attempts = updated.failed_login_attempts,
                    locked_until = %until,
                    "Account locked after repeated failures"
                ),
                _ => warn!(
                    user_id = %updated.id,
                    attempts = updated.failed_login_attempts,
                    "Login failed: wrong password"
                ),
            }
            return Err(refusal.into());
        }

        let tokens = self.tokens.issue(account_id)?;
        let Some(account) = self
            .credentials
            .record_successful_login(account_id, now)
            .await?
        else {
            return Err(self.refusal_after_race(account_id, now).await);
        };

        info!(user_id = %account.id, username = %account.username, "Login succeeded");
        Ok(LoginOutcome { account, tokens })
    }

    /// Classify a store refusal: another node locked the account between
    /// our check and our write, or the account disappeared.
    async fn refusal_after_race(&self, account_id: Uuid, now: DateTime<Utc>) -> AccountError {
        match self.credentials.find_by_id(account_id).await {
            Ok(Some(account)) => match self.lockout.check(&account, now) {
                Err(locked) => {
                    warn!(user_id = %account_id, "Login refused: account locked concurrently");
                    locked.into()
                }
                Ok(()) => AppError::internal("Login state changed concurrently").into(),
            },
            Ok(None) => LockoutError::InvalidCredentials.into(),
            Err(e) => e.into(),
        }
    }

    /// Exchanges a refresh token for a new pair. The old token stays valid.
    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedTokens, AccountError> {
        let subject = self.tokens.verify(refresh_token, TokenKind::Refresh)?;
        if self.credentials.find_by_id(subject).await?.is_none() {
            return Err(AccountError::AccountNotFound);
        }

        let tokens = self.tokens.issue(subject)?;
        info!(user_id = %subject, "Tokens refreshed");
        Ok(tokens)
    }

    /// Resolves an access token to its account.
    pub async fn authenticate(&self, access_token: &str) -> Result<Account, AccountError> {
        let subject = self.tokens.verify(access_token, TokenKind::Access)?;
        self.profile(subject).await
    }

    /// Loads the account for `account_id`.
    pub async fn profile(&self, account_id: Uuid) -> Result<Account, AccountError> {
        self.credentials
            .find_by_id(account_id)
            .await?
            .ok_or(AccountError::AccountNotFound)
    }

    fn validate_username(&self, username: &str) -> Result<(), AccountError> {
        let (min, max) = self.username_bounds;
        let len = username.chars().count();
        if len < min || len > max {
            return Err(AccountError::InvalidUsername(format!(
                "username must be between {min} and {max} characters"
            )));
        }
        if username.chars().any(char::is_whitespace) {
            return Err(AccountError::InvalidUsername(
                "username must not contain whitespace".into(),
            ));
        }
        Ok(())
    }

    async fn hash(&self, password: &str) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash_password(&password))
            .await
            .map_err(|e| AppError::internal(format!("Hashing task failed: {e}")))?
    }

    async fn verify(&self, password: String, hash: String) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::internal(format!("Verification task failed: {e}")))?
    }
}
