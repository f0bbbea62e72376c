//! Auth handlers and supporting modules.
//!
//! This module coordinates signup enrollment, session management, and the
//! OTP-gated account update flow.
//!
//! ## Enrollment
//!
//! `GET /v1/auth/signup` rotates a pending secret for the browser's signup
//! context and hands back enrollment material. `POST /v1/auth/signup` consumes
//! the pending secret atomically: a valid code commits the account with the
//! second factor already required, anything else burns the secret and returns
//! fresh material.
//!
//! ## Reauthentication
//!
//! Login and account update both demand a current code once a secret is
//! committed. Login failures are deliberately indistinguishable from each
//! other; account update reports the OTP failure specifically since the
//! caller already holds a session.

pub(crate) mod account;
pub(crate) mod login;
pub(crate) mod session;
pub(crate) mod signup;
mod state;
mod storage;
pub(crate) mod types;
mod utils;

pub use state::{AuthConfig, AuthState};
