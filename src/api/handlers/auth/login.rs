//! Login endpoint: password plus OTP in a single generic-failure gate.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::{
    session::session_cookie,
    state::AuthState,
    storage::insert_session,
    types::{LoginRequest, SessionResponse},
};
use crate::reauth;

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session established", body = SessionResponse),
        (status = 400, description = "Missing payload"),
        (status = 422, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload").into_response();
    };

    let checked = reauth::check_login(
        auth_state.accounts(),
        &request.email,
        &request.password,
        request.otp_attempt.as_deref(),
        auth_state.config().drift_steps(),
    )
    .await;

    // One message for every failure mode; nothing distinguishes an unknown
    // email from a wrong password or a wrong code.
    let account = match checked {
        Ok(Some(account)) => account,
        Ok(None) => return (StatusCode::UNPROCESSABLE_ENTITY, "Invalid credentials").into_response(),
        Err(err) => {
            error!("Failed to check login: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let ttl_seconds = auth_state.config().session_ttl_seconds();
    let token = match insert_session(&pool, account.id, ttl_seconds).await {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to create session: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = session_cookie(auth_state.config(), &token) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    let response = SessionResponse {
        user_id: account.id.to_string(),
        email: account.email,
    };
    (StatusCode::OK, response_headers, Json(response)).into_response()
}
