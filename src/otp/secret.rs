//! Shared-secret provisioning and enrollment artifact rendering.

use anyhow::{Context, Result};
use data_encoding::BASE32_NOPAD;
use rand::{rngs::OsRng, RngCore};
use url::Url;

/// Raw secret length in bytes (160 bits, the RFC 4226 recommended size).
pub const SECRET_LEN: usize = 20;

/// An opaque TOTP shared secret.
///
/// The raw bytes never appear in `Debug` output; render with
/// [`OtpSecret::to_base32`] only when handing the secret to the enrolling
/// user.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpSecret(Vec<u8>);

impl OtpSecret {
    /// Generate a fresh random secret from the OS CSPRNG.
    ///
    /// # Errors
    /// Returns an error if the OS random source fails.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; SECRET_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .context("failed to generate OTP secret")?;
        Ok(Self(bytes.to_vec()))
    }

    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Decode a base32 secret as entered by a user or read from storage.
    /// Accepts lowercase and padded input; returns `None` when malformed.
    #[must_use]
    pub fn from_base32(encoded: &str) -> Option<Self> {
        let normalized: String = encoded
            .trim()
            .trim_end_matches('=')
            .to_ascii_uppercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        BASE32_NOPAD
            .decode(normalized.as_bytes())
            .ok()
            .map(OtpSecret)
    }

    /// Base32 rendering for authenticator apps.
    #[must_use]
    pub fn to_base32(&self) -> String {
        BASE32_NOPAD.encode(&self.0)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for OtpSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("OtpSecret").field(&"***").finish()
    }
}

/// The enrollment artifact shown to the user exactly once, at provisioning
/// time: the base32 secret and the otpauth:// URI a QR code would encode.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub secret_base32: String,
    pub otpauth_uri: String,
}

/// Render the provisioning URI for a secret. Deterministic, no side effects.
///
/// Encodes issuer, label, and the RFC 6238 defaults (SHA1, 6 digits, 30s
/// period) so any standard authenticator can enroll from it.
///
/// # Errors
/// Returns an error if the URI cannot be assembled (malformed issuer/label).
pub fn render_enrollment(secret: &OtpSecret, issuer: &str, label: &str) -> Result<Enrollment> {
    let secret_base32 = secret.to_base32();

    let mut uri = Url::parse("otpauth://totp/").context("failed to build otpauth URI")?;
    uri.set_path(&format!("{issuer}:{label}"));
    uri.query_pairs_mut()
        .append_pair("secret", &secret_base32)
        .append_pair("issuer", issuer)
        .append_pair("algorithm", "SHA1")
        .append_pair("digits", "6")
        .append_pair("period", "30");

    Ok(Enrollment {
        secret_base32,
        otpauth_uri: uri.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn generate_has_expected_length() {
        let secret = OtpSecret::generate().unwrap();
        assert_eq!(secret.as_bytes().len(), SECRET_LEN);
    }

    #[test]
    fn generate_is_not_repeatable() {
        let first = OtpSecret::generate().unwrap();
        let second = OtpSecret::generate().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn base32_round_trip() {
        let secret = OtpSecret::from_bytes(b"12345678901234567890".to_vec());
        let encoded = secret.to_base32();
        assert_eq!(encoded, "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");
        let decoded = OtpSecret::from_base32(&encoded).unwrap();
        assert_eq!(decoded, secret);
    }

    #[test]
    fn from_base32_accepts_lowercase_and_padding() {
        let secret = OtpSecret::from_bytes(b"12345678901234567890".to_vec());
        let sloppy = format!("{}==", secret.to_base32().to_lowercase());
        assert_eq!(OtpSecret::from_base32(&sloppy), Some(secret));
    }

    #[test]
    fn from_base32_rejects_garbage() {
        assert_eq!(OtpSecret::from_base32("not base32 !!!"), None);
    }

    #[test]
    fn debug_redacts_secret_bytes() {
        let secret = OtpSecret::from_bytes(b"12345678901234567890".to_vec());
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("1234"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn enrollment_uri_is_deterministic() {
        let secret = OtpSecret::from_bytes(b"12345678901234567890".to_vec());
        let first = render_enrollment(&secret, "Gardi", "alice@example.com").unwrap();
        let second = render_enrollment(&secret, "Gardi", "alice@example.com").unwrap();
        assert_eq!(first.otpauth_uri, second.otpauth_uri);
    }

    #[test]
    fn enrollment_uri_carries_defaults() {
        let secret = OtpSecret::from_bytes(b"12345678901234567890".to_vec());
        let enrollment = render_enrollment(&secret, "Gardi", "alice@example.com").unwrap();
        assert!(enrollment.otpauth_uri.starts_with("otpauth://totp/"));
        assert!(enrollment
            .otpauth_uri
            .contains(&format!("secret={}", enrollment.secret_base32)));
        assert!(enrollment.otpauth_uri.contains("issuer=Gardi"));
        assert!(enrollment.otpauth_uri.contains("algorithm=SHA1"));
        assert!(enrollment.otpauth_uri.contains("digits=6"));
        assert!(enrollment.otpauth_uri.contains("period=30"));
    }
}
