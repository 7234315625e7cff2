use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use tracing::{error, info};

use crate::models::account::TRIAL_DAYS;
use crate::responses::JsonResponse;
use crate::routes::auth::{issue_access_token, session_cookie};
use crate::state::AppState;
use crate::utils::password::hash_password;

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SignupRequest>,
) -> Response {
    let email = payload.email.trim().to_lowercase();
    if email.len() < 3 || !email.contains('@') {
        return JsonResponse::bad_request("A valid email address is required").into_response();
    }
    if payload.password.len() < 8 {
        return JsonResponse::bad_request("Password must be at least 8 characters").into_response();
    }
    let name = payload.name.trim();
    if name.is_empty() {
        return JsonResponse::bad_request("Name is required").into_response();
    }

    match state.accounts.is_email_taken(&email).await {
        Ok(true) => {
            return JsonResponse::conflict("An account with this email already exists")
                .into_response()
        }
        Ok(false) => {}
        Err(err) => {
            error!(error = %err, "email lookup failed during signup");
            return JsonResponse::server_error("Signup failed").into_response();
        }
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!(error = %err, "password hashing failed");
            return JsonResponse::server_error("Signup failed").into_response();
        }
    };

    let trial_ends_at = OffsetDateTime::now_utc() + Duration::days(TRIAL_DAYS);
    let account = match state
        .accounts
        .create_account(&email, &password_hash, name, trial_ends_at)
        .await
    {
        Ok(account) => account,
        Err(err) => {
            error!(error = %err, "account creation failed");
            return JsonResponse::server_error("Signup failed").into_response();
        }
    };
    info!(account_id = %account.id, "account created");

    let token = match issue_access_token(&state, &account) {
        Ok(token) => token,
        Err(err) => {
            error!(error = %err, "token issuance failed after signup");
            return JsonResponse::server_error("Signup failed").into_response();
        }
    };

    (
        jar.add(session_cookie(token, state.config.auth_cookie_secure)),
        JsonResponse::success("Account created"),
    )
        .into_response()
}
