//! Account update endpoint, gated by a fresh OTP while enrolled.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::{
    session::authenticate_session,
    state::AuthState,
    storage::SessionRecord,
    types::{AccountResponse, AccountUpdateRequest},
};
use crate::account::{normalize_email, valid_email, Account, AccountChanges, AccountStore, UpdateOutcome};
use crate::password;
use crate::reauth::{self, UpdateGate};

fn account_response(account: Account) -> AccountResponse {
    AccountResponse {
        user_id: account.id.to_string(),
        email: account.email,
        otp_required: account.otp_required,
    }
}

#[utoipa::path(
    patch,
    path = "/v1/auth/account",
    request_body = AccountUpdateRequest,
    responses(
        (status = 200, description = "Account updated", body = AccountResponse),
        (status = 400, description = "Missing payload"),
        (status = 401, description = "No active session"),
        (status = 422, description = "OTP check failed or fields invalid"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn account_update(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<AccountUpdateRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload").into_response();
    };

    let record = match authenticate_session(&headers, &pool).await {
        Ok(Some(record)) => record,
        Ok(None) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(status) => return status.into_response(),
    };
    let SessionRecord { user_id, email: _ } = record;

    let account = match auth_state.accounts().find_by_id(user_id).await {
        Ok(Some(account)) => account,
        // Session outlived the account; treat as unauthenticated.
        Ok(None) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Failed to load account: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // The gate runs before any field is validated or written; a wrong code
    // leaves the account untouched.
    let gate = reauth::check_update(
        &account,
        request.otp_attempt.as_deref(),
        auth_state.config().drift_steps(),
    );
    if gate == UpdateGate::WrongOtp {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": "wrong otp"})),
        )
            .into_response();
    }

    let mut changes = AccountChanges::default();
    if let Some(new_email) = request.email {
        let normalized = normalize_email(&new_email);
        if !valid_email(&normalized) {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({"error": "email-invalid"})),
            )
                .into_response();
        }
        changes.email = Some(normalized);
    }
    if let Some(new_password) = request.password {
        match password::hash_password(&new_password) {
            Ok(hash) => changes.password_hash = Some(hash),
            Err(err) => {
                error!("Failed to hash password: {err}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }

    if changes.is_empty() {
        return (StatusCode::OK, Json(account_response(account))).into_response();
    }

    match auth_state.accounts().update_fields(user_id, changes).await {
        Ok(UpdateOutcome::Updated(updated)) => {
            (StatusCode::OK, Json(account_response(updated))).into_response()
        }
        Ok(UpdateOutcome::Conflict) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": "email-taken"})),
        )
            .into_response(),
        Ok(UpdateOutcome::NotFound) => StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Failed to update account: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
