//! RFC 6238 TOTP verification as a pure function of secret, time, and drift.
//!
//! No hidden clock source: callers inject `now` through the `_at` variants,
//! which is also how the tests pin time. Verification failure is a normal
//! outcome, so nothing here returns an error or panics — malformed input is
//! simply `false`.

use crate::otp::secret::OtpSecret;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha1 = Hmac<Sha1>;

/// Code length produced and accepted.
pub const DIGITS: usize = 6;

/// TOTP time-step size in seconds.
pub const STEP_SECONDS: u64 = 30;

/// Default symmetric drift tolerance: one step (30s) either direction.
pub const DEFAULT_DRIFT_STEPS: u32 = 1;

/// Current unix time in seconds.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// Strip all whitespace from a submitted code. Users routinely copy codes
/// with interior spaces ("123 456").
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.chars().filter(|c| !c.is_whitespace()).collect()
}

/// RFC 4226 HOTP: HMAC-SHA1 over the big-endian counter, dynamic truncation,
/// reduced to [`DIGITS`] decimal digits.
fn hotp(secret: &[u8], counter: u64) -> Option<String> {
    let mut mac = HmacSha1::new_from_slice(secret).ok()?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = usize::from(*digest.last()?) & 0xf;
    let chunk: [u8; 4] = digest.get(offset..offset + 4)?.try_into().ok()?;
    let code = (u32::from_be_bytes(chunk) & 0x7fff_ffff) % 1_000_000;
    Some(format!("{code:06}"))
}

/// The code a correct authenticator would display at `now_unix`.
#[must_use]
pub fn code_at(secret: &OtpSecret, now_unix: u64) -> Option<String> {
    if secret.as_bytes().is_empty() {
        return None;
    }
    hotp(secret.as_bytes(), now_unix / STEP_SECONDS)
}

/// Verify a submitted code against the current step and up to `drift_steps`
/// steps before and after it (symmetric window).
#[must_use]
pub fn verify_at(secret: &OtpSecret, submitted: &str, drift_steps: u32, now_unix: u64) -> bool {
    let normalized = normalize_code(submitted);
    if normalized.len() != DIGITS || !normalized.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if secret.as_bytes().is_empty() {
        return false;
    }

    let step = now_unix / STEP_SECONDS;
    let drift = u64::from(drift_steps);
    let first = step.saturating_sub(drift);
    let last = step.saturating_add(drift);
    (first..=last)
        .any(|candidate| hotp(secret.as_bytes(), candidate).is_some_and(|code| code == normalized))
}

/// Verify against the system clock.
#[must_use]
pub fn verify(secret: &OtpSecret, submitted: &str, drift_steps: u32) -> bool {
    verify_at(secret, submitted, drift_steps, unix_now())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // RFC 4226 / RFC 6238 reference secret.
    fn rfc_secret() -> OtpSecret {
        OtpSecret::from_bytes(b"12345678901234567890".to_vec())
    }

    #[test]
    fn hotp_rfc4226_vectors() {
        let secret = rfc_secret();
        let expected = [
            "755224", "287082", "359152", "969429", "338314", "254676", "287922", "162583",
            "399871", "520489",
        ];
        for (counter, want) in expected.iter().enumerate() {
            let got = hotp(secret.as_bytes(), counter as u64).unwrap();
            assert_eq!(&got, want, "counter {counter}");
        }
    }

    #[test]
    fn totp_rfc6238_vectors() {
        // RFC 6238 appendix B times, truncated to six digits.
        let secret = rfc_secret();
        let cases: [(u64, &str); 6] = [
            (59, "287082"),
            (1_111_111_109, "081804"),
            (1_111_111_111, "050471"),
            (1_234_567_890, "005924"),
            (2_000_000_000, "279037"),
            (20_000_000_000, "353130"),
        ];
        for (time, want) in cases {
            assert_eq!(code_at(&secret, time).unwrap(), want, "time {time}");
            assert!(verify_at(&secret, want, 0, time));
        }
    }

    #[test]
    fn accepts_codes_within_symmetric_drift_window() {
        let secret = rfc_secret();
        let now = 1_234_567_890;
        for drift in [1u32, 2] {
            for offset in 1..=u64::from(drift) {
                let behind = code_at(&secret, now - offset * STEP_SECONDS).unwrap();
                let ahead = code_at(&secret, now + offset * STEP_SECONDS).unwrap();
                assert!(verify_at(&secret, &behind, drift, now), "behind {offset}");
                assert!(verify_at(&secret, &ahead, drift, now), "ahead {offset}");
            }
        }
    }

    #[test]
    fn rejects_codes_exactly_one_step_outside_window() {
        let secret = rfc_secret();
        let now = 1_234_567_890;
        for drift in [0u32, 1, 2] {
            let outside = u64::from(drift) + 1;
            let behind = code_at(&secret, now - outside * STEP_SECONDS).unwrap();
            let ahead = code_at(&secret, now + outside * STEP_SECONDS).unwrap();
            assert!(!verify_at(&secret, &behind, drift, now), "drift {drift}");
            assert!(!verify_at(&secret, &ahead, drift, now), "drift {drift}");
        }
    }

    #[test]
    fn whitespace_is_equivalent_to_stripped_code() {
        let secret = rfc_secret();
        let now = 1_111_111_109;
        let code = code_at(&secret, now).unwrap();
        let padded = format!(" {} {} \t", &code[..3], &code[3..]);
        assert_eq!(
            verify_at(&secret, &padded, 1, now),
            verify_at(&secret, &code, 1, now),
        );
        assert!(verify_at(&secret, &padded, 1, now));
    }

    #[test]
    fn rejects_malformed_codes() {
        let secret = rfc_secret();
        let now = 1_234_567_890;
        for bad in ["", "12345", "1234567", "12a456", "......", "123 45"] {
            assert!(!verify_at(&secret, bad, 2, now), "code {bad:?}");
        }
    }

    #[test]
    fn rejects_empty_secret() {
        let empty = OtpSecret::from_bytes(Vec::new());
        assert!(!verify_at(&empty, "123456", 2, 1_234_567_890));
        assert!(code_at(&empty, 1_234_567_890).is_none());
    }

    #[test]
    fn rejects_code_for_a_different_secret() {
        let secret = rfc_secret();
        let other = OtpSecret::from_bytes(b"09876543210987654321".to_vec());
        let now = 1_234_567_890;
        let code = code_at(&other, now).unwrap();
        assert!(!verify_at(&secret, &code, 2, now));
    }
}
