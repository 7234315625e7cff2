use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::error;

use crate::responses::JsonResponse;
use crate::routes::auth::{issue_access_token, session_cookie};
use crate::state::AppState;
use crate::utils::password::verify_password;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Response {
    // One generic failure message; which step failed is not disclosed.
    let denied = || JsonResponse::unauthorized("Invalid email or password").into_response();

    let account = match state.accounts.find_account_by_email(payload.email.trim()).await {
        Ok(Some(account)) => account,
        Ok(None) => return denied(),
        Err(err) => {
            error!(error = %err, "account lookup failed during login");
            return JsonResponse::server_error("Login failed").into_response();
        }
    };
    if !account.is_active || account.is_suspended {
        return denied();
    }

    match verify_password(&payload.password, &account.password_hash) {
        Ok(true) => {}
        Ok(false) => return denied(),
        Err(err) => {
            error!(error = %err, "stored password hash is unreadable");
            return JsonResponse::server_error("Login failed").into_response();
        }
    }

    let token = match issue_access_token(&state, &account) {
        Ok(token) => token,
        Err(err) => {
            error!(error = %err, "token issuance failed during login");
            return JsonResponse::server_error("Login failed").into_response();
        }
    };

    (
        jar.add(session_cookie(token, state.config.auth_cookie_secure)),
        JsonResponse::success("Logged in"),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    use crate::db::mock_db::MockDb;
    use crate::models::account::fixtures::trial_account;
    use crate::state::test_support::test_state;
    use crate::utils::password::hash_password;

    fn login_app(state: crate::state::AppState) -> Router {
        Router::new()
            .route("/api/auth/login", post(login))
            .with_state(state)
    }

    async fn post_login(app: Router, body: &str) -> axum::response::Response {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    fn account_with_password(password: &str) -> crate::models::account::Account {
        let mut account = trial_account();
        account.password_hash = hash_password(password).unwrap();
        account
    }

    #[tokio::test]
    async fn valid_credentials_set_session_cookie() {
        let account = account_with_password("correct-horse-battery");
        let state = test_state(MockDb::with_account(account));

        let response = post_login(
            login_app(state),
            r#"{"email":"rider@example.com","password":"correct-horse-battery"}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(cookie.starts_with("auth_token="));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let account = account_with_password("correct-horse-battery");
        let state = test_state(MockDb::with_account(account));

        let response = post_login(
            login_app(state),
            r#"{"email":"rider@example.com","password":"wrong"}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_email_is_unauthorized() {
        let state = test_state(MockDb::default());
        let response = post_login(
            login_app(state),
            r#"{"email":"nobody@example.com","password":"whatever-long"}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn suspended_account_cannot_log_in() {
        let mut account = account_with_password("correct-horse-battery");
        account.is_suspended = true;
        account.suspension_reason = Some("unpaid livery fees".into());
        let state = test_state(MockDb::with_account(account));

        let response = post_login(
            login_app(state),
            r#"{"email":"rider@example.com","password":"correct-horse-battery"}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn deactivated_account_cannot_log_in() {
        let mut account = account_with_password("correct-horse-battery");
        account.is_active = false;
        let state = test_state(MockDb::with_account(account));

        let response = post_login(
            login_app(state),
            r#"{"email":"rider@example.com","password":"correct-horse-battery"}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
