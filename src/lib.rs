//! # Gardi (TOTP-gated registration & sessions)
//!
//! `gardi` layers a time-based one-time-password (TOTP) second factor on top
//! of account registration and session establishment.
//!
//! ## Enrollment model
//!
//! A shared secret is provisioned *before* the account exists: beginning a
//! signup mints a per-context pending challenge (secret + enrollment URI)
//! held only in memory. The secret is committed to the account in the same
//! atomic write that creates it, and only after the caller proves possession
//! by submitting a correct code. A rejected code always rotates the pending
//! secret, so no code can be retried against the same secret.
//!
//! ## Reauthentication
//!
//! Once committed, the secret gates every login and every sensitive account
//! mutation:
//!
//! - **Login** failures are reported as a generic credential error so an
//!   attacker cannot learn whether an account exists or has OTP enabled.
//! - **Account updates** require a fresh code against the committed secret
//!   and surface an explicit "wrong otp" error (the session already proves
//!   the account exists).
//!
//! Clock drift between authenticator and server is absorbed by a small,
//! symmetric window of adjacent 30-second time steps.

pub mod account;
pub mod api;
pub mod cli;
pub mod otp;
pub mod password;
pub mod reauth;
pub mod signup;
