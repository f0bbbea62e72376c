//! Registration orchestrator: the two-step signup state machine.
//!
//! `FormRendered → AwaitingSubmission → {Committed | Rejected → FormRendered}`
//!
//! Entering `FormRendered` always provisions a fresh pending secret, including
//! after a rejection — a rejected code is never retried against the same
//! secret, which closes the brute-force window on a single challenge. The
//! secret reaches durable storage only inside the same atomic write that
//! creates the account, and only after the submitted code verified.

use crate::account::{
    normalize_email, valid_email, Account, AccountStore, CreateOutcome, NewAccount,
};
use crate::otp::challenge::ChallengeStore;
use crate::otp::secret::{render_enrollment, Enrollment};
use crate::otp::verifier::{self, unix_now};
use crate::password;
use anyhow::Result;
use uuid::Uuid;

/// Signup state for one interaction context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupPhase {
    /// Enrollment artifact rendered; a pending challenge exists.
    FormRendered,
    /// Credentials + code received, verification in progress.
    AwaitingSubmission,
    /// Account persisted with its committed secret; challenge cleared.
    Committed,
    /// Submission refused; re-enters `FormRendered` with a rotated secret.
    Rejected,
}

/// Events driving [`SignupPhase`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupEvent {
    Render,
    Submit,
    Commit,
    Reject,
}

impl SignupPhase {
    /// Transition function. Events that are invalid for the current phase
    /// leave the machine where it is.
    #[must_use]
    pub fn advance(self, event: SignupEvent) -> Self {
        match (self, event) {
            (_, SignupEvent::Render) => Self::FormRendered,
            (Self::FormRendered, SignupEvent::Submit) => Self::AwaitingSubmission,
            (Self::AwaitingSubmission, SignupEvent::Commit) => Self::Committed,
            (Self::AwaitingSubmission, SignupEvent::Reject) => Self::Rejected,
            (phase, _) => phase,
        }
    }
}

/// Why a submission was refused on the OTP side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpRejection {
    /// No code was submitted at all.
    MissingOtp,
    /// A code was submitted but failed verification. An absent or expired
    /// pending challenge also lands here; the caller cannot tell the cases
    /// apart.
    InvalidOtp,
}

impl OtpRejection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingOtp => "otp-missing",
            Self::InvalidOtp => "otp-not-valid",
        }
    }
}

/// Credential validation failure, surfaced only after the code verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    InvalidEmail,
    EmailTaken,
}

impl CredentialError {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidEmail => "email-invalid",
            Self::EmailTaken => "email-taken",
        }
    }
}

/// Fields accepted on submission. `otp_attempt: None` means the field was not
/// sent at all; an empty string still counts as a (failing) attempt.
#[derive(Debug, Clone)]
pub struct SignupFields {
    pub email: String,
    pub password: String,
    pub otp_attempt: Option<String>,
}

/// Result of one submission. Every non-committed variant carries the freshly
/// rotated enrollment artifact for re-rendering the form.
#[derive(Debug)]
pub enum SubmitOutcome {
    Committed(Account),
    Rejected {
        reason: OtpRejection,
        enrollment: Enrollment,
    },
    CredentialsRejected {
        error: CredentialError,
        enrollment: Enrollment,
    },
}

impl SubmitOutcome {
    /// Phase the state machine reached for this outcome.
    #[must_use]
    pub fn phase(&self) -> SignupPhase {
        let submitted = SignupPhase::FormRendered.advance(SignupEvent::Submit);
        match self {
            Self::Committed(_) => submitted.advance(SignupEvent::Commit),
            Self::Rejected { .. } | Self::CredentialsRejected { .. } => {
                submitted.advance(SignupEvent::Reject)
            }
        }
    }
}

/// Drives the signup flow over an [`AccountStore`] and a [`ChallengeStore`].
#[derive(Clone)]
pub struct Orchestrator<S> {
    accounts: S,
    challenges: ChallengeStore,
    issuer: String,
    drift_steps: u32,
}

impl<S: AccountStore> Orchestrator<S> {
    #[must_use]
    pub fn new(accounts: S, challenges: ChallengeStore, issuer: String, drift_steps: u32) -> Self {
        Self {
            accounts,
            challenges,
            issuer,
            drift_steps,
        }
    }

    #[must_use]
    pub fn challenges(&self) -> &ChallengeStore {
        &self.challenges
    }

    /// Enter `FormRendered`: rotate the pending challenge for `context` and
    /// render the enrollment artifact.
    ///
    /// # Errors
    /// Returns an error if secret generation or rendering fails.
    pub fn begin(&self, context: Uuid) -> Result<Enrollment> {
        self.begin_at(context, unix_now())
    }

    /// [`Orchestrator::begin`] with an injected clock.
    ///
    /// # Errors
    /// Returns an error if secret generation or rendering fails.
    pub fn begin_at(&self, context: Uuid, now_unix: u64) -> Result<Enrollment> {
        let challenge = self.challenges.begin_at(context, now_unix)?;
        // No email exists yet; the label falls back to the issuer name.
        render_enrollment(&challenge.secret, &self.issuer, &self.issuer)
    }

    /// Submit credentials + code for `context`.
    ///
    /// # Errors
    /// Returns an error only for infrastructure failures (store, RNG);
    /// verification and validation failures are ordinary outcomes.
    pub async fn submit(&self, context: Uuid, fields: SignupFields) -> Result<SubmitOutcome> {
        self.submit_at(context, fields, unix_now()).await
    }

    /// [`Orchestrator::submit`] with an injected clock.
    ///
    /// # Errors
    /// Returns an error only for infrastructure failures.
    pub async fn submit_at(
        &self,
        context: Uuid,
        fields: SignupFields,
        now_unix: u64,
    ) -> Result<SubmitOutcome> {
        // No code at all: reject before any account construction.
        let Some(attempt) = fields.otp_attempt else {
            return self.reject(context, OtpRejection::MissingOtp, now_unix);
        };

        // Atomically claim the pending secret. Absent means a lost session,
        // a replayed request, or an expired challenge; all present to the
        // caller as a failed verification.
        let Some(secret) = self.challenges.take_at(context, now_unix) else {
            return self.reject(context, OtpRejection::InvalidOtp, now_unix);
        };

        if !verifier::verify_at(&secret, &attempt, self.drift_steps, now_unix) {
            return self.reject(context, OtpRejection::InvalidOtp, now_unix);
        }

        let email = normalize_email(&fields.email);
        if !valid_email(&email) {
            return self.reject_credentials(context, CredentialError::InvalidEmail, now_unix);
        }

        let password_hash = password::hash_password(&fields.password)?;
        let new_account = NewAccount {
            email,
            password_hash,
        };
        match self.accounts.create_with_secret(new_account, &secret).await? {
            // `take` above already cleared the pending challenge, so the
            // context holds no secret once the account row exists.
            CreateOutcome::Created(account) => Ok(SubmitOutcome::Committed(account)),
            CreateOutcome::Conflict => {
                self.reject_credentials(context, CredentialError::EmailTaken, now_unix)
            }
        }
    }

    fn reject(
        &self,
        context: Uuid,
        reason: OtpRejection,
        now_unix: u64,
    ) -> Result<SubmitOutcome> {
        let enrollment = self.begin_at(context, now_unix)?;
        Ok(SubmitOutcome::Rejected { reason, enrollment })
    }

    fn reject_credentials(
        &self,
        context: Uuid,
        error: CredentialError,
        now_unix: u64,
    ) -> Result<SubmitOutcome> {
        // The verified secret is discarded, never committed; the next attempt
        // gets a fresh one.
        let enrollment = self.begin_at(context, now_unix)?;
        Ok(SubmitOutcome::CredentialsRejected { error, enrollment })
    }
}
