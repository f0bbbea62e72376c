//! TOTP core: secret provisioning, code verification, and the transient
//! challenge store used during signup.

pub mod challenge;
pub mod secret;
pub mod verifier;

pub use challenge::{ChallengeStore, PendingChallenge};
pub use secret::{Enrollment, OtpSecret};
