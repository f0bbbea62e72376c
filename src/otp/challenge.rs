//! Transient challenge store: the only cross-request state in the core.
//!
//! Holds the not-yet-committed secret for each in-flight signup attempt,
//! keyed by the caller's interaction context. Entries live in memory only and
//! are never written to durable storage. `take` is a single map removal under
//! one lock, so two racing submissions for the same context cannot both
//! observe the secret as present.

use crate::otp::secret::OtpSecret;
use crate::otp::verifier::unix_now;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// A freshly generated secret bound to one signup attempt.
#[derive(Debug, Clone)]
pub struct PendingChallenge {
    pub secret: OtpSecret,
    /// Unix seconds at generation time, for max-age eviction.
    pub created_at: u64,
}

/// Context-keyed store of pending challenges.
///
/// Cloning shares the underlying map, matching how the store is handed to
/// request handlers.
#[derive(Clone)]
pub struct ChallengeStore {
    inner: Arc<Mutex<HashMap<Uuid, PendingChallenge>>>,
    max_age_seconds: Option<u64>,
}

impl ChallengeStore {
    /// A store that evicts challenges older than `max_age_seconds`.
    /// `None` disables age-based eviction (rotation-on-failure still applies).
    #[must_use]
    pub fn new(max_age_seconds: Option<u64>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_age_seconds,
        }
    }

    /// Generate and store a fresh challenge for `context`, overwriting any
    /// prior one. The previous secret becomes unusable immediately.
    ///
    /// # Errors
    /// Returns an error if secret generation fails.
    pub fn begin(&self, context: Uuid) -> Result<PendingChallenge> {
        self.begin_at(context, unix_now())
    }

    /// [`ChallengeStore::begin`] with an injected clock.
    ///
    /// # Errors
    /// Returns an error if secret generation fails.
    pub fn begin_at(&self, context: Uuid, now_unix: u64) -> Result<PendingChallenge> {
        let challenge = PendingChallenge {
            secret: OtpSecret::generate()?,
            created_at: now_unix,
        };
        self.lock().insert(context, challenge.clone());
        Ok(challenge)
    }

    /// Read the pending secret without consuming it.
    #[must_use]
    pub fn peek(&self, context: Uuid) -> Option<OtpSecret> {
        self.peek_at(context, unix_now())
    }

    /// [`ChallengeStore::peek`] with an injected clock. Expired entries are
    /// dropped and reported as absent.
    #[must_use]
    pub fn peek_at(&self, context: Uuid, now_unix: u64) -> Option<OtpSecret> {
        let mut map = self.lock();
        if map
            .get(&context)
            .is_some_and(|challenge| self.expired(challenge, now_unix))
        {
            map.remove(&context);
            return None;
        }
        map.get(&context).map(|challenge| challenge.secret.clone())
    }

    /// Atomically retrieve and delete the pending secret. Used exactly once,
    /// at the moment of successful verification; a second call for the same
    /// context returns `None`.
    #[must_use]
    pub fn take(&self, context: Uuid) -> Option<OtpSecret> {
        self.take_at(context, unix_now())
    }

    /// [`ChallengeStore::take`] with an injected clock.
    #[must_use]
    pub fn take_at(&self, context: Uuid, now_unix: u64) -> Option<OtpSecret> {
        let challenge = self.lock().remove(&context)?;
        if self.expired(&challenge, now_unix) {
            return None;
        }
        Some(challenge.secret)
    }

    /// Drop the pending challenge for `context`, if any.
    pub fn clear(&self, context: Uuid) {
        self.lock().remove(&context);
    }

    fn expired(&self, challenge: &PendingChallenge, now_unix: u64) -> bool {
        self.max_age_seconds
            .is_some_and(|max_age| now_unix.saturating_sub(challenge.created_at) > max_age)
    }

    // Lock is held only for map operations, never across an await point.
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, PendingChallenge>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn begin_then_peek_returns_same_secret() {
        let store = ChallengeStore::new(None);
        let context = Uuid::new_v4();
        let challenge = store.begin_at(context, 100).unwrap();
        assert_eq!(store.peek_at(context, 100), Some(challenge.secret.clone()));
        // peek does not consume
        assert_eq!(store.peek_at(context, 100), Some(challenge.secret));
    }

    #[test]
    fn begin_overwrites_previous_challenge() {
        let store = ChallengeStore::new(None);
        let context = Uuid::new_v4();
        let first = store.begin_at(context, 100).unwrap();
        let second = store.begin_at(context, 100).unwrap();
        assert_ne!(first.secret, second.secret);
        assert_eq!(store.peek_at(context, 100), Some(second.secret));
    }

    #[test]
    fn take_consumes_and_second_take_is_none() {
        let store = ChallengeStore::new(None);
        let context = Uuid::new_v4();
        let challenge = store.begin_at(context, 100).unwrap();
        assert_eq!(store.take_at(context, 100), Some(challenge.secret));
        assert_eq!(store.take_at(context, 100), None);
        assert_eq!(store.peek_at(context, 100), None);
    }

    #[test]
    fn contexts_are_isolated() {
        let store = ChallengeStore::new(None);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let alice_challenge = store.begin_at(alice, 100).unwrap();
        let bob_challenge = store.begin_at(bob, 100).unwrap();
        assert_ne!(alice_challenge.secret, bob_challenge.secret);
        assert_eq!(store.take_at(alice, 100), Some(alice_challenge.secret));
        assert_eq!(store.peek_at(bob, 100), Some(bob_challenge.secret));
    }

    #[test]
    fn unknown_context_is_absent() {
        let store = ChallengeStore::new(None);
        assert_eq!(store.peek_at(Uuid::new_v4(), 100), None);
        assert_eq!(store.take_at(Uuid::new_v4(), 100), None);
    }

    #[test]
    fn entries_expire_after_max_age() {
        let store = ChallengeStore::new(Some(60));
        let context = Uuid::new_v4();
        store.begin_at(context, 1_000).unwrap();
        assert!(store.peek_at(context, 1_060).is_some());
        assert_eq!(store.peek_at(context, 1_061), None);
        // the expired entry was dropped entirely
        assert_eq!(store.take_at(context, 1_000), None);
    }

    #[test]
    fn take_refuses_expired_entry() {
        let store = ChallengeStore::new(Some(60));
        let context = Uuid::new_v4();
        store.begin_at(context, 1_000).unwrap();
        assert_eq!(store.take_at(context, 2_000), None);
        assert_eq!(store.take_at(context, 1_000), None);
    }

    #[test]
    fn without_max_age_entries_never_expire() {
        let store = ChallengeStore::new(None);
        let context = Uuid::new_v4();
        let challenge = store.begin_at(context, 0).unwrap();
        assert_eq!(store.peek_at(context, u64::MAX), Some(challenge.secret));
    }
}
