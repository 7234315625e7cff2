use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::responses::JsonResponse;
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: i64 = 100;

pub async fn list_accounts(State(state): State<AppState>) -> Response {
    match state.accounts.list_accounts(DEFAULT_LIST_LIMIT).await {
        Ok(accounts) => Json(accounts).into_response(),
        Err(err) => {
            error!(error = %err, "account listing failed");
            JsonResponse::server_error("Account listing failed").into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct SuspendRequest {
    pub reason: String,
}

pub async fn suspend_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<SuspendRequest>,
) -> Response {
    let account = match state.accounts.find_account_by_id(account_id).await {
        Ok(Some(account)) => account,
        Ok(None) => return JsonResponse::not_found("Account not found").into_response(),
        Err(err) => {
            error!(error = %err, "account lookup failed");
            return JsonResponse::server_error("Suspension failed").into_response();
        }
    };

    let reason = payload.reason.trim().to_string();
    if reason.is_empty() {
        return JsonResponse::bad_request("A suspension reason is required").into_response();
    }

    if let Err(err) = state.accounts.suspend_account(account_id, &reason).await {
        error!(error = %err, "account suspension failed");
        return JsonResponse::server_error("Suspension failed").into_response();
    }
    info!(%account_id, "account suspended");

    let mailer = Arc::clone(&state.mailer);
    tokio::spawn(async move {
        if let Err(err) = mailer.send_suspension_email(&account.email, &reason).await {
            warn!(error = %err, email = %account.email, "suspension notice failed to send");
        }
    });

    JsonResponse::success("Account suspended").into_response()
}

pub async fn reinstate_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Response {
    match state.accounts.find_account_by_id(account_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return JsonResponse::not_found("Account not found").into_response(),
        Err(err) => {
            error!(error = %err, "account lookup failed");
            return JsonResponse::server_error("Reinstatement failed").into_response();
        }
    }

    if let Err(err) = state.accounts.reinstate_account(account_id).await {
        error!(error = %err, "account reinstatement failed");
        return JsonResponse::server_error("Reinstatement failed").into_response();
    }
    info!(%account_id, "account reinstated");
    JsonResponse::success("Account reinstated").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::{get, post};
    use axum::Router;
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::db::mock_db::{MockAdminUnlockRepository, MockBillingEventRepository, MockDb};
    use crate::models::account::fixtures::trial_account;
    use crate::services::smtp_mailer::mock_mailer::MockMailer;
    use crate::services::stripe::mock::MockStripeService;
    use crate::state::test_support::test_state_with;

    fn admin_app(state: AppState) -> Router {
        Router::new()
            .route("/api/admin/accounts", get(list_accounts))
            .route("/api/admin/accounts/{id}/suspend", post(suspend_account))
            .route("/api/admin/accounts/{id}/reinstate", post(reinstate_account))
            .with_state(state)
    }

    #[tokio::test]
    async fn suspend_marks_account_and_sends_notice() {
        let account = trial_account();
        let account_id = account.id;
        let db = std::sync::Arc::new(MockDb::with_account(account));
        let mailer = std::sync::Arc::new(MockMailer::default());
        let state = test_state_with(
            db.clone(),
            std::sync::Arc::new(MockBillingEventRepository::default()),
            std::sync::Arc::new(MockAdminUnlockRepository::default()),
            std::sync::Arc::new(MockStripeService::new()),
            mailer.clone(),
        );

        let response = admin_app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/admin/accounts/{account_id}/suspend"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"reason":"unpaid livery fees"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let updated = db.account(account_id).unwrap();
        assert!(updated.is_suspended);
        assert_eq!(updated.suspension_reason.as_deref(), Some("unpaid livery fees"));

        tokio::time::sleep(Duration::from_millis(20)).await;
        let notices = mailer.sent_suspension_notices.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].1, "unpaid livery fees");
    }

    #[tokio::test]
    async fn reinstate_clears_suspension() {
        let mut account = trial_account();
        account.is_suspended = true;
        account.suspension_reason = Some("unpaid livery fees".into());
        let account_id = account.id;
        let db = std::sync::Arc::new(MockDb::with_account(account));
        let state = test_state_with(
            db.clone(),
            std::sync::Arc::new(MockBillingEventRepository::default()),
            std::sync::Arc::new(MockAdminUnlockRepository::default()),
            std::sync::Arc::new(MockStripeService::new()),
            std::sync::Arc::new(MockMailer::default()),
        );

        let response = admin_app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/admin/accounts/{account_id}/reinstate"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let updated = db.account(account_id).unwrap();
        assert!(!updated.is_suspended);
        assert!(updated.suspension_reason.is_none());
    }

    #[tokio::test]
    async fn suspending_a_missing_account_is_not_found() {
        let state = test_state_with(
            std::sync::Arc::new(MockDb::default()),
            std::sync::Arc::new(MockBillingEventRepository::default()),
            std::sync::Arc::new(MockAdminUnlockRepository::default()),
            std::sync::Arc::new(MockStripeService::new()),
            std::sync::Arc::new(MockMailer::default()),
        );

        let response = admin_app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/admin/accounts/{}/suspend", Uuid::new_v4()))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"reason":"spam"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
