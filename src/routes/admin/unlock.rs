use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};
use tracing::{error, info};

use crate::models::account::Account;
use crate::models::admin_unlock::{ADMIN_SESSION_MINUTES, LOCKOUT_MINUTES, MAX_UNLOCK_ATTEMPTS};
use crate::responses::JsonResponse;
use crate::routes::gate::load_account;
use crate::session::AuthSession;
use crate::state::AppState;
use crate::utils::password::verify_password;

fn rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_default()
}

fn lockout_response(until: OffsetDateTime) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "status": "error",
            "success": false,
            "message": "Too many unlock attempts",
            "retry_after": rfc3339(until),
        })),
    )
        .into_response()
}

async fn admin_caller(state: &AppState, session: &AuthSession) -> Result<Account, Response> {
    let account = load_account(state, session).await?;
    if !account.is_admin() {
        return Err(JsonResponse::forbidden_with_code(
            "Administrator role required",
            "admin_required",
        )
        .into_response());
    }
    Ok(account)
}

/// First step of the challenge: report remaining attempts, or the lockout
/// deadline if the caller has exhausted them.
pub async fn unlock_challenge(State(state): State<AppState>, session: AuthSession) -> Response {
    let account = match admin_caller(&state, &session).await {
        Ok(account) => account,
        Err(response) => return response,
    };

    let now = OffsetDateTime::now_utc();
    let attempts = match state.admin_unlock.get_attempts(account.id, now).await {
        Ok(attempts) => attempts,
        Err(err) => {
            error!(error = %err, "unlock attempt lookup failed");
            return JsonResponse::server_error("Unlock unavailable").into_response();
        }
    };

    if attempts >= MAX_UNLOCK_ATTEMPTS {
        match state.admin_unlock.get_lockout_until(account.id).await {
            Ok(Some(until)) if until > now => return lockout_response(until),
            Ok(_) => {}
            Err(err) => {
                error!(error = %err, "lockout lookup failed");
                return JsonResponse::server_error("Unlock unavailable").into_response();
            }
        }
    }

    Json(json!({
        "remaining_attempts": (MAX_UNLOCK_ATTEMPTS - attempts).max(0),
    }))
    .into_response()
}

#[derive(Deserialize)]
pub struct UnlockRequest {
    pub password: String,
}

/// Second step: submit the admin-mode password.
///
/// The attempt counter is incremented before the password is compared, and
/// the over-limit rejection fires on the incremented count. A sixth attempt
/// therefore locks and is refused without revealing whether its password was
/// correct.
pub async fn submit_unlock(
    State(state): State<AppState>,
    session: AuthSession,
    Json(payload): Json<UnlockRequest>,
) -> Response {
    let account = match admin_caller(&state, &session).await {
        Ok(account) => account,
        Err(response) => return response,
    };

    let now = OffsetDateTime::now_utc();
    let attempts = match state.admin_unlock.get_attempts(account.id, now).await {
        Ok(attempts) => attempts,
        Err(err) => {
            error!(error = %err, "unlock attempt lookup failed");
            return JsonResponse::server_error("Unlock unavailable").into_response();
        }
    };
    if attempts >= MAX_UNLOCK_ATTEMPTS {
        // Still inside an active lockout: refuse without another increment.
        match state.admin_unlock.get_lockout_until(account.id).await {
            Ok(Some(until)) if until > now => return lockout_response(until),
            Ok(_) => {}
            Err(err) => {
                error!(error = %err, "lockout lookup failed");
                return JsonResponse::server_error("Unlock unavailable").into_response();
            }
        }
    }

    let count = match state.admin_unlock.increment_attempts(account.id, now).await {
        Ok(count) => count,
        Err(err) => {
            error!(error = %err, "unlock attempt increment failed");
            return JsonResponse::server_error("Unlock unavailable").into_response();
        }
    };
    if count > MAX_UNLOCK_ATTEMPTS {
        let until = now + Duration::minutes(LOCKOUT_MINUTES);
        if let Err(err) = state.admin_unlock.set_lockout(account.id, until).await {
            error!(error = %err, "failed to persist lockout");
            return JsonResponse::server_error("Unlock unavailable").into_response();
        }
        info!(account_id = %account.id, "admin unlock locked out");
        return lockout_response(until);
    }

    match verify_password(&payload.password, &state.config.admin_mode_password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return JsonResponse::unauthorized("Incorrect admin password").into_response();
        }
        Err(err) => {
            error!(error = %err, "admin password hash is unreadable");
            return JsonResponse::server_error("Unlock unavailable").into_response();
        }
    }

    if let Err(err) = state.admin_unlock.reset_attempts(account.id).await {
        error!(error = %err, "failed to reset unlock attempts");
        return JsonResponse::server_error("Unlock unavailable").into_response();
    }
    let expires_at = now + Duration::minutes(ADMIN_SESSION_MINUTES);
    let admin_session = match state.admin_unlock.create_session(account.id, expires_at).await {
        Ok(session) => session,
        Err(err) => {
            error!(error = %err, "failed to create admin session");
            return JsonResponse::server_error("Unlock unavailable").into_response();
        }
    };
    info!(account_id = %account.id, "admin mode unlocked");

    Json(json!({
        "success": true,
        "expires_at": rfc3339(admin_session.expires_at),
    }))
    .into_response()
}

/// Explicitly drop the live admin session.
pub async fn lock_admin(State(state): State<AppState>, session: AuthSession) -> Response {
    let account = match admin_caller(&state, &session).await {
        Ok(account) => account,
        Err(response) => return response,
    };

    if let Err(err) = state.admin_unlock.delete_session(account.id).await {
        error!(error = %err, "failed to delete admin session");
        return JsonResponse::server_error("Lock failed").into_response();
    }
    JsonResponse::success("Admin mode locked").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tower::ServiceExt;

    use crate::db::mock_db::{
        MockAdminUnlockRepository, MockBillingEventRepository, MockDb,
    };
    use crate::models::account::fixtures::trial_account;
    use crate::models::account::AccountRole;
    use crate::routes::auth::claims::{Claims, TokenUse};
    use crate::services::smtp_mailer::mock_mailer::MockMailer;
    use crate::services::stripe::mock::MockStripeService;
    use crate::state::test_support::{test_config, test_state_with};
    use crate::utils::jwt::create_jwt;
    use crate::utils::password::hash_password;

    const ADMIN_PASSWORD: &str = "saddle-up-and-ride";

    struct Fixture {
        state: AppState,
        unlock: Arc<MockAdminUnlockRepository>,
        cookie: String,
        account_id: uuid::Uuid,
    }

    fn fixture() -> Fixture {
        let mut account = trial_account();
        account.role = Some(AccountRole::Admin);
        let account_id = account.id;

        let unlock = Arc::new(MockAdminUnlockRepository::default());
        let base = test_state_with(
            Arc::new(MockDb::with_account(account.clone())),
            Arc::new(MockBillingEventRepository::default()),
            unlock.clone(),
            Arc::new(MockStripeService::new()),
            Arc::new(MockMailer::default()),
        );
        let mut config = test_config();
        config.admin_mode_password_hash = hash_password(ADMIN_PASSWORD).unwrap();
        let state = AppState {
            config: Arc::new(config),
            ..base
        };

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as usize;
        let claims = Claims {
            id: account.id.to_string(),
            email: account.email.clone(),
            exp: now + 3600,
            role: account.role,
            iss: String::new(),
            aud: String::new(),
            token_use: TokenUse::Access,
        };
        let token = create_jwt(
            claims,
            &state.jwt_keys,
            &state.config.jwt_issuer,
            &state.config.jwt_audience,
        )
        .unwrap();

        Fixture {
            state,
            unlock,
            cookie: format!("auth_token={token}"),
            account_id,
        }
    }

    fn unlock_app(state: AppState) -> Router {
        Router::new()
            .route("/api/admin/unlock/challenge", post(unlock_challenge))
            .route("/api/admin/unlock", post(submit_unlock))
            .route("/api/admin/lock", post(lock_admin))
            .with_state(state)
    }

    async fn post_json(
        app: &Router,
        cookie: &str,
        path: &str,
        body: Option<String>,
    ) -> axum::response::Response {
        let builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::COOKIE, cookie);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn submit_password(app: &Router, cookie: &str, password: &str) -> axum::response::Response {
        post_json(
            app,
            cookie,
            "/api/admin/unlock",
            Some(format!(r#"{{"password":"{password}"}}"#)),
        )
        .await
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 8192).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn correct_password_creates_session_and_resets_attempts() {
        let f = fixture();
        let app = unlock_app(f.state.clone());

        let _ = submit_password(&app, &f.cookie, "wrong-guess").await;

        let response = submit_password(&app, &f.cookie, ADMIN_PASSWORD).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["expires_at"].as_str().is_some());

        assert_eq!(
            f.unlock.attempts.lock().unwrap().get(&f.account_id),
            Some(&(0, None))
        );
        assert!(f.unlock.sessions.lock().unwrap().contains_key(&f.account_id));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized_and_counts() {
        let f = fixture();
        let app = unlock_app(f.state.clone());

        let response = submit_password(&app, &f.cookie, "wrong-guess").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(f.unlock.attempts.lock().unwrap()[&f.account_id].0, 1);
    }

    #[tokio::test]
    async fn sixth_attempt_locks_before_password_comparison() {
        let f = fixture();
        let app = unlock_app(f.state.clone());

        for _ in 0..5 {
            let response = submit_password(&app, &f.cookie, "wrong-guess").await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        // The sixth submission carries the *correct* password but must still
        // be refused on the incremented count.
        let response = submit_password(&app, &f.cookie, ADMIN_PASSWORD).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let json = body_json(response).await;
        assert!(json["retry_after"].as_str().is_some());
        assert!(f.unlock.sessions.lock().unwrap().is_empty());

        // A seventh attempt during the lockout does not increment further.
        let response = submit_password(&app, &f.cookie, ADMIN_PASSWORD).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(f.unlock.attempts.lock().unwrap()[&f.account_id].0, 6);
    }

    #[tokio::test]
    async fn lockout_expires_lazily() {
        let f = fixture();
        let app = unlock_app(f.state.clone());

        f.unlock.attempts.lock().unwrap().insert(
            f.account_id,
            (6, Some(OffsetDateTime::now_utc() - Duration::minutes(1))),
        );

        let response = post_json(&app, &f.cookie, "/api/admin/unlock/challenge", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["remaining_attempts"], MAX_UNLOCK_ATTEMPTS);
        assert_eq!(
            f.unlock.attempts.lock().unwrap()[&f.account_id],
            (0, None)
        );
    }

    #[tokio::test]
    async fn challenge_reports_lockout_with_retry_after() {
        let f = fixture();
        let app = unlock_app(f.state.clone());

        f.unlock.attempts.lock().unwrap().insert(
            f.account_id,
            (6, Some(OffsetDateTime::now_utc() + Duration::minutes(10))),
        );

        let response = post_json(&app, &f.cookie, "/api/admin/unlock/challenge", None).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let json = body_json(response).await;
        assert!(json["retry_after"].as_str().is_some());
    }

    #[tokio::test]
    async fn non_admin_cannot_use_unlock() {
        let mut f = fixture();
        // Re-issue the fixture with a plain user.
        let account = trial_account();
        let db = Arc::new(MockDb::with_account(account.clone()));
        f.state = AppState {
            accounts: db,
            ..f.state
        };
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as usize;
        let claims = Claims {
            id: account.id.to_string(),
            email: account.email.clone(),
            exp: now + 3600,
            role: account.role,
            iss: String::new(),
            aud: String::new(),
            token_use: TokenUse::Access,
        };
        let token = create_jwt(
            claims,
            &f.state.jwt_keys,
            &f.state.config.jwt_issuer,
            &f.state.config.jwt_audience,
        )
        .unwrap();
        let cookie = format!("auth_token={token}");

        let app = unlock_app(f.state.clone());
        let response = submit_password(&app, &cookie, ADMIN_PASSWORD).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn lock_deletes_the_session() {
        let f = fixture();
        let app = unlock_app(f.state.clone());

        let response = submit_password(&app, &f.cookie, ADMIN_PASSWORD).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(f.unlock.sessions.lock().unwrap().contains_key(&f.account_id));

        let response = post_json(&app, &f.cookie, "/api/admin/lock", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(f.unlock.sessions.lock().unwrap().is_empty());
    }
}
