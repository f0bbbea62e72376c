//! Reauthentication gate: OTP checks against an account's committed secret.
//!
//! Two call sites, both after primary credentials are established: session
//! login and sensitive account update. Unlike signup there is no challenge
//! rotation here — the secret is permanent.

use crate::account::{normalize_email, Account, AccountStore};
use crate::otp::verifier::{self, unix_now};
use crate::password;
use anyhow::Result;

/// Outcome of the update-time OTP gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateGate {
    Allowed,
    /// Code missing or failed verification; no field change may be applied.
    WrongOtp,
}

/// Full login check: email lookup, password verification, then the OTP gate
/// when the account has a committed secret.
///
/// Returns `Ok(None)` for *every* failure mode — unknown email, wrong
/// password, missing code, invalid code — so the caller can only surface a
/// generic credential error and nothing leaks about account existence or
/// OTP enrollment.
///
/// # Errors
/// Returns an error only for store failures.
pub async fn check_login<S: AccountStore>(
    accounts: &S,
    email: &str,
    submitted_password: &str,
    otp_attempt: Option<&str>,
    drift_steps: u32,
) -> Result<Option<Account>> {
    check_login_at(
        accounts,
        email,
        submitted_password,
        otp_attempt,
        drift_steps,
        unix_now(),
    )
    .await
}

/// [`check_login`] with an injected clock.
///
/// # Errors
/// Returns an error only for store failures.
pub async fn check_login_at<S: AccountStore>(
    accounts: &S,
    email: &str,
    submitted_password: &str,
    otp_attempt: Option<&str>,
    drift_steps: u32,
    now_unix: u64,
) -> Result<Option<Account>> {
    let Some(account) = accounts.find_by_email(&normalize_email(email)).await? else {
        return Ok(None);
    };
    if !password::verify_password(submitted_password, &account.password_hash) {
        return Ok(None);
    }
    if account.otp_required {
        let Some(secret) = account.committed_secret() else {
            // unreachable while the storage invariant holds; fail closed
            return Ok(None);
        };
        let Some(attempt) = otp_attempt else {
            return Ok(None);
        };
        if !verifier::verify_at(secret, attempt, drift_steps, now_unix) {
            return Ok(None);
        }
    }
    Ok(Some(account))
}

/// Update-time gate: verify a freshly submitted code against the account's
/// committed secret before any field change. Accounts without a committed
/// secret have no second factor to prove.
#[must_use]
pub fn check_update(account: &Account, otp_attempt: Option<&str>, drift_steps: u32) -> UpdateGate {
    check_update_at(account, otp_attempt, drift_steps, unix_now())
}

/// [`check_update`] with an injected clock.
#[must_use]
pub fn check_update_at(
    account: &Account,
    otp_attempt: Option<&str>,
    drift_steps: u32,
    now_unix: u64,
) -> UpdateGate {
    let Some(secret) = account.committed_secret() else {
        return UpdateGate::Allowed;
    };
    let Some(attempt) = otp_attempt else {
        return UpdateGate::WrongOtp;
    };
    if verifier::verify_at(secret, attempt, drift_steps, now_unix) {
        UpdateGate::Allowed
    } else {
        UpdateGate::WrongOtp
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::account::memory::MemoryAccountStore;
    use crate::account::{CreateOutcome, NewAccount};
    use crate::otp::secret::OtpSecret;
    use crate::otp::verifier::code_at;

    const NOW: u64 = 1_234_567_890;

    async fn enrolled_account(store: &MemoryAccountStore) -> (Account, OtpSecret) {
        let secret = OtpSecret::generate().unwrap();
        let outcome = store
            .create_with_secret(
                NewAccount {
                    email: "example@example.com".to_string(),
                    password_hash: password::hash_password("example123").unwrap(),
                },
                &secret,
            )
            .await
            .unwrap();
        let CreateOutcome::Created(account) = outcome else {
            panic!("expected creation");
        };
        (account, secret)
    }

    #[tokio::test]
    async fn login_without_otp_fails() {
        let store = MemoryAccountStore::new();
        enrolled_account(&store).await;
        let result = check_login_at(&store, "example@example.com", "example123", None, 1, NOW)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    /// A well-formed code guaranteed to fall outside the ±1-step window.
    fn wrong_code(secret: &OtpSecret, now: u64) -> String {
        let window = [now - 30, now, now + 30].map(|t| code_at(secret, t).unwrap());
        (0..10)
            .map(|digit| format!("{digit}{digit}{digit}{digit}{digit}{digit}"))
            .find(|candidate| !window.contains(candidate))
            .unwrap()
    }

    #[tokio::test]
    async fn login_with_invalid_otp_fails() {
        let store = MemoryAccountStore::new();
        let (_, secret) = enrolled_account(&store).await;
        let code = wrong_code(&secret, NOW);
        let result = check_login_at(
            &store,
            "example@example.com",
            "example123",
            Some(&code),
            1,
            NOW,
        )
        .await
        .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn login_with_valid_otp_succeeds() {
        let store = MemoryAccountStore::new();
        let (account, secret) = enrolled_account(&store).await;
        let code = code_at(&secret, NOW).unwrap();
        let result = check_login_at(
            &store,
            "Example@Example.com",
            "example123",
            Some(&code),
            1,
            NOW,
        )
        .await
        .unwrap();
        assert_eq!(result.map(|found| found.id), Some(account.id));
    }

    #[tokio::test]
    async fn login_with_wrong_password_fails_even_with_valid_otp() {
        let store = MemoryAccountStore::new();
        let (_, secret) = enrolled_account(&store).await;
        let code = code_at(&secret, NOW).unwrap();
        let result = check_login_at(
            &store,
            "example@example.com",
            "wrong-password",
            Some(&code),
            1,
            NOW,
        )
        .await
        .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn login_for_unknown_account_fails() {
        let store = MemoryAccountStore::new();
        let result = check_login_at(&store, "ghost@example.com", "whatever", None, 1, NOW)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_with_missing_code_is_refused() {
        let store = MemoryAccountStore::new();
        let (account, _) = enrolled_account(&store).await;
        assert_eq!(check_update_at(&account, None, 1, NOW), UpdateGate::WrongOtp);
    }

    #[tokio::test]
    async fn update_with_invalid_code_is_refused() {
        let store = MemoryAccountStore::new();
        let (account, secret) = enrolled_account(&store).await;
        let code = wrong_code(&secret, NOW);
        assert_eq!(
            check_update_at(&account, Some(&code), 1, NOW),
            UpdateGate::WrongOtp
        );
    }

    #[tokio::test]
    async fn update_with_current_code_is_allowed() {
        let store = MemoryAccountStore::new();
        let (account, secret) = enrolled_account(&store).await;
        let code = code_at(&secret, NOW).unwrap();
        assert_eq!(
            check_update_at(&account, Some(&code), 1, NOW),
            UpdateGate::Allowed
        );
    }
}
