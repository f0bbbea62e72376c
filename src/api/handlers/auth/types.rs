//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EnrollmentResponse {
    /// Base32 secret for manual authenticator entry.
    pub secret: String,
    /// `otpauth://` URI for QR provisioning.
    pub otpauth_uri: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    /// Code from the authenticator enrolled against the pending secret.
    pub otp_attempt: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignupErrorResponse {
    pub error: String,
    /// Fresh enrollment material; the previous pending secret is gone.
    pub enrollment: EnrollmentResponse,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignupResponse {
    pub user_id: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub otp_attempt: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AccountUpdateRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    /// A current code is required while the account has a committed secret.
    pub otp_attempt: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AccountResponse {
    pub user_id: String,
    pub email: String,
    pub otp_required: bool,
}
