//! Signup endpoints: enrollment rendering and atomic submit.

use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::{
    state::{AuthConfig, AuthState},
    types::{EnrollmentResponse, SignupErrorResponse, SignupRequest, SignupResponse},
    utils::cookie_value,
};
use crate::otp::secret::Enrollment;
use crate::signup::{SignupFields, SubmitOutcome};

const SIGNUP_COOKIE_NAME: &str = "gardi_signup";

fn enrollment_response(enrollment: Enrollment) -> EnrollmentResponse {
    EnrollmentResponse {
        secret: enrollment.secret_base32,
        otpauth_uri: enrollment.otpauth_uri,
    }
}

/// Resolve the anonymous signup context, minting a fresh one when the browser
/// has no cookie yet. Unparseable cookies get a fresh context too.
fn signup_context(headers: &HeaderMap) -> Uuid {
    cookie_value(headers, SIGNUP_COOKIE_NAME)
        .and_then(|value| value.parse().ok())
        .unwrap_or_else(Uuid::new_v4)
}

fn signup_cookie(
    auth_config: &AuthConfig,
    context: Uuid,
) -> Result<HeaderValue, InvalidHeaderValue> {
    // Session-scoped on purpose: abandoning the browser abandons the context.
    let mut cookie = format!("{SIGNUP_COOKIE_NAME}={context}; Path=/; HttpOnly; SameSite=Lax");
    if auth_config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

#[utoipa::path(
    get,
    path = "/v1/auth/signup",
    responses(
        (status = 200, description = "Fresh enrollment material for the signup form", body = EnrollmentResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn signup_begin(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let context = signup_context(&headers);
    // Every render rotates the pending secret; a reloaded form never shows a
    // stale QR code.
    let enrollment = match auth_state.orchestrator().begin(context) {
        Ok(enrollment) => enrollment,
        Err(err) => {
            error!("Failed to begin signup: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = signup_cookie(auth_state.config(), context) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (
        StatusCode::OK,
        response_headers,
        Json(enrollment_response(enrollment)),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created with the second factor committed", body = SignupResponse),
        (status = 400, description = "Submission rejected; body carries fresh enrollment material", body = SignupErrorResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn signup_submit(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignupRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload").into_response();
    };

    // A browser that never rendered the form (or lost its cookie) gets a new
    // context with no pending challenge, so the attempt fails the OTP check
    // and the response hands back fresh material under the new context.
    let context = signup_context(&headers);
    let fields = SignupFields {
        email: request.email,
        password: request.password,
        otp_attempt: request.otp_attempt,
    };

    let outcome = match auth_state.orchestrator().submit(context, fields).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("Failed to process signup: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = signup_cookie(auth_state.config(), context) {
        response_headers.insert(SET_COOKIE, cookie);
    }

    match outcome {
        SubmitOutcome::Committed(account) => {
            let response = SignupResponse {
                user_id: account.id.to_string(),
                email: account.email,
            };
            (StatusCode::CREATED, response_headers, Json(response)).into_response()
        }
        SubmitOutcome::Rejected { reason, enrollment } => {
            let response = SignupErrorResponse {
                error: reason.as_str().to_string(),
                enrollment: enrollment_response(enrollment),
            };
            (StatusCode::BAD_REQUEST, response_headers, Json(response)).into_response()
        }
        SubmitOutcome::CredentialsRejected { error, enrollment } => {
            let response = SignupErrorResponse {
                error: error.as_str().to_string(),
                enrollment: enrollment_response(enrollment),
            };
            (StatusCode::BAD_REQUEST, response_headers, Json(response)).into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{http::header::COOKIE, response::Response};
    use serde::de::DeserializeOwned;
    use sqlx::PgPool;

    // Lazy pool: no connection is made until a query runs, and none of the
    // branches exercised here touch the database.
    fn lazy_state() -> Extension<Arc<AuthState>> {
        let pool = PgPool::connect_lazy("postgres://gardi@localhost:5432/gardi").unwrap();
        Extension(Arc::new(AuthState::new(AuthConfig::new(), pool)))
    }

    async fn response_json<T: DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(otp_attempt: Option<String>) -> SignupRequest {
        SignupRequest {
            email: "alice@example.com".to_string(),
            password: "example123".to_string(),
            otp_attempt,
        }
    }

    #[tokio::test]
    async fn submit_without_payload_is_bad_request() {
        let response = signup_submit(HeaderMap::new(), lazy_state(), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_code_maps_to_bad_request_with_fresh_material() {
        let state = lazy_state();
        let context = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("gardi_signup={context}")).unwrap(),
        );

        let begin = signup_begin(headers.clone(), state.clone())
            .await
            .into_response();
        assert_eq!(begin.status(), StatusCode::OK);
        let first: EnrollmentResponse = response_json(begin).await;

        let response = signup_submit(headers, state, Some(Json(request(None))))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(SET_COOKIE).is_some());
        let body: SignupErrorResponse = response_json(response).await;
        assert_eq!(body.error, "otp-missing");
        // The rejection rotated the pending secret.
        assert_ne!(body.enrollment.secret, first.secret);
    }

    #[tokio::test]
    async fn unknown_context_maps_to_bad_request() {
        let response = signup_submit(
            HeaderMap::new(),
            lazy_state(),
            Some(Json(request(Some("123456".to_string())))),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: SignupErrorResponse = response_json(response).await;
        assert_eq!(body.error, "otp-not-valid");
    }

    #[test]
    fn signup_context_reuses_cookie() {
        let context = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("gardi_signup={context}")).unwrap(),
        );
        assert_eq!(signup_context(&headers), context);
    }

    #[test]
    fn signup_context_mints_fresh_on_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("gardi_signup=not-a-uuid"));
        let first = signup_context(&headers);
        let second = signup_context(&headers);
        assert_ne!(first, second);
    }

    #[test]
    fn signup_cookie_is_session_scoped() {
        let cookie = signup_cookie(&AuthConfig::new(), Uuid::new_v4()).unwrap();
        let rendered = cookie.to_str().unwrap();
        assert!(rendered.contains("HttpOnly"));
        assert!(!rendered.contains("Max-Age"));
    }
}
