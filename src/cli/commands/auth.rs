use anyhow::{Context, Result};
use clap::{Arg, Command};

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("otp-issuer")
                .long("otp-issuer")
                .help("Issuer label embedded in otpauth:// provisioning URIs")
                .env("GARDI_OTP_ISSUER")
                .default_value("Gardi"),
        )
        .arg(
            Arg::new("otp-drift-steps")
                .long("otp-drift-steps")
                .help("Accepted clock drift in 30-second steps on either side of now")
                .env("GARDI_OTP_DRIFT_STEPS")
                .default_value("1")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session cookie TTL in seconds")
                .env("GARDI_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("challenge-ttl-seconds")
                .long("challenge-ttl-seconds")
                .help("Max age of a pending signup challenge in seconds (0 disables expiry)")
                .env("GARDI_CHALLENGE_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend base URL used for the CORS allow-origin")
                .env("GARDI_FRONTEND_BASE_URL")
                .default_value("http://localhost:3000"),
        )
}

/// Auth options parsed out of CLI matches.
#[derive(Debug, Clone)]
pub struct Options {
    pub issuer: String,
    pub drift_steps: u32,
    pub session_ttl_seconds: i64,
    pub challenge_ttl_seconds: u64,
    pub frontend_base_url: String,
}

impl Options {
    /// Extract auth options from validated matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is somehow missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            issuer: matches
                .get_one::<String>("otp-issuer")
                .cloned()
                .context("missing required argument: --otp-issuer")?,
            drift_steps: matches
                .get_one::<u32>("otp-drift-steps")
                .copied()
                .context("missing required argument: --otp-drift-steps")?,
            session_ttl_seconds: matches
                .get_one::<i64>("session-ttl-seconds")
                .copied()
                .context("missing required argument: --session-ttl-seconds")?,
            challenge_ttl_seconds: matches
                .get_one::<u64>("challenge-ttl-seconds")
                .copied()
                .context("missing required argument: --challenge-ttl-seconds")?,
            frontend_base_url: matches
                .get_one::<String>("frontend-base-url")
                .cloned()
                .context("missing required argument: --frontend-base-url")?,
        })
    }
}
