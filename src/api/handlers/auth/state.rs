//! Auth configuration and shared handler state.

use crate::account::PgAccountStore;
use crate::otp::challenge::ChallengeStore;
use crate::otp::verifier::DEFAULT_DRIFT_STEPS;
use crate::signup::Orchestrator;
use sqlx::PgPool;

const DEFAULT_ISSUER: &str = "Gardi";
const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
const DEFAULT_CHALLENGE_MAX_AGE_SECONDS: u64 = 15 * 60;
const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    issuer: String,
    drift_steps: u32,
    session_ttl_seconds: i64,
    challenge_max_age_seconds: Option<u64>,
    frontend_base_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            drift_steps: DEFAULT_DRIFT_STEPS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            challenge_max_age_seconds: Some(DEFAULT_CHALLENGE_MAX_AGE_SECONDS),
            frontend_base_url: DEFAULT_FRONTEND_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_drift_steps(mut self, drift_steps: u32) -> Self {
        self.drift_steps = drift_steps;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    /// `None` disables challenge age-based eviction.
    #[must_use]
    pub fn with_challenge_max_age_seconds(mut self, seconds: Option<u64>) -> Self {
        self.challenge_max_age_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_frontend_base_url(mut self, url: String) -> Self {
        self.frontend_base_url = url;
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn drift_steps(&self) -> u32 {
        self.drift_steps
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn challenge_max_age_seconds(&self) -> Option<u64> {
        self.challenge_max_age_seconds
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Shared state handed to every auth handler.
pub struct AuthState {
    config: AuthConfig,
    accounts: PgAccountStore,
    orchestrator: Orchestrator<PgAccountStore>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, pool: PgPool) -> Self {
        let accounts = PgAccountStore::new(pool);
        let challenges = ChallengeStore::new(config.challenge_max_age_seconds());
        let orchestrator = Orchestrator::new(
            accounts.clone(),
            challenges,
            config.issuer().to_string(),
            config.drift_steps(),
        );
        Self {
            config,
            accounts,
            orchestrator,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn accounts(&self) -> &PgAccountStore {
        &self.accounts
    }

    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator<PgAccountStore> {
        &self.orchestrator
    }
}
