use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::responses::JsonResponse;
use crate::state::AppState;

const DEFAULT_EVENT_LIMIT: i64 = 50;

/// Newest ledger rows, errors included. The dashboard uses this to spot
/// deliveries that keep failing.
pub async fn list_billing_events(State(state): State<AppState>) -> Response {
    match state.billing_events.list_recent_events(DEFAULT_EVENT_LIMIT).await {
        Ok(events) => Json(events).into_response(),
        Err(err) => {
            error!(error = %err, "billing event listing failed");
            JsonResponse::server_error("Billing event listing failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::db::billing_event_repository::BillingEventRepository;
    use crate::db::mock_db::{MockAdminUnlockRepository, MockBillingEventRepository, MockDb};
    use crate::services::smtp_mailer::mock_mailer::MockMailer;
    use crate::services::stripe::mock::MockStripeService;
    use crate::state::test_support::test_state_with;

    #[tokio::test]
    async fn lists_recorded_events_with_errors() {
        let ledger = Arc::new(MockBillingEventRepository::default());
        ledger
            .record_event("evt_1", "invoice.payment_failed", &json!({}))
            .await
            .unwrap();
        ledger
            .mark_processed("evt_1", Some("stripe api error: boom"))
            .await
            .unwrap();

        let state = test_state_with(
            Arc::new(MockDb::default()),
            ledger,
            Arc::new(MockAdminUnlockRepository::default()),
            Arc::new(MockStripeService::new()),
            Arc::new(MockMailer::default()),
        );
        let app = Router::new()
            .route("/api/admin/billing-events", get(list_billing_events))
            .with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/admin/billing-events")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 8192).await.unwrap();
        let events: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(events.as_array().unwrap().len(), 1);
        assert_eq!(events[0]["event_id"], "evt_1");
        assert_eq!(events[0]["error"], "stripe api error: boom");
    }
}
