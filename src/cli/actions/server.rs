use crate::api;
use anyhow::Result;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub otp_issuer: String,
    pub otp_drift_steps: u32,
    pub session_ttl_seconds: i64,
    pub challenge_ttl_seconds: u64,
    pub frontend_base_url: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let challenge_max_age = if args.challenge_ttl_seconds == 0 {
        None
    } else {
        Some(args.challenge_ttl_seconds)
    };

    let auth_config = api::handlers::auth::AuthConfig::new()
        .with_issuer(args.otp_issuer)
        .with_drift_steps(args.otp_drift_steps)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_challenge_max_age_seconds(challenge_max_age)
        .with_frontend_base_url(args.frontend_base_url);

    api::new(args.port, args.dsn, auth_config).await
}
