//! Account model and the persistence contract the core depends on.
//!
//! The store API is deliberately narrow: an account can only be created
//! together with its committed secret (one atomic write), so no persisted
//! state can ever hold `otp_required` without a secret or vice versa.

pub mod memory;
pub mod postgres;

use crate::otp::secret::OtpSecret;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use postgres::PgAccountStore;

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
        .is_ok_and(|regex| regex.is_match(email_normalized))
}

/// A persisted account.
#[derive(Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub otp_secret: Option<OtpSecret>,
    pub otp_required: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// The committed secret, present only when OTP is required.
    #[must_use]
    pub fn committed_secret(&self) -> Option<&OtpSecret> {
        if self.otp_required {
            self.otp_secret.as_ref()
        } else {
            None
        }
    }

    /// `otp_required == true ⇔ otp_secret` present.
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        self.otp_required == self.otp_secret.is_some()
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"***")
            .field("otp_secret", &self.otp_secret)
            .field("otp_required", &self.otp_required)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Credential fields for a new account. Email is expected to be normalized
/// and format-checked by the caller before it reaches the store.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
}

/// Partial update of account credential fields. The committed secret is not
/// reachable through this type.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

impl AccountChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password_hash.is_none()
    }
}

/// Outcome when attempting to create an account (conflict = duplicate email).
#[derive(Debug)]
pub enum CreateOutcome {
    Created(Account),
    Conflict,
}

/// Outcome when attempting to update account fields.
#[derive(Debug)]
pub enum UpdateOutcome {
    Updated(Account),
    Conflict,
    NotFound,
}

/// Persistence contract for accounts.
///
/// `create_with_secret` must write credentials, secret, and `otp_required`
/// as a single atomic operation; a crash must never leave a half-enrolled
/// account observable.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create an account with its committed secret in one atomic write.
    async fn create_with_secret(
        &self,
        new_account: NewAccount,
        secret: &OtpSecret,
    ) -> Result<CreateOutcome>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Apply credential field changes; the committed secret is untouched.
    async fn update_fields(&self, id: Uuid, changes: AccountChanges) -> Result<UpdateOutcome>;
}
