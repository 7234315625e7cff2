use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::billing::lifecycle::{apply_event, BillingEvent};
use crate::responses::JsonResponse;
use crate::state::AppState;

/// Stripe webhook entry point.
///
/// The body must stay raw bytes until the signature is verified. After that:
/// ledger fast-path for already-processed events, record, apply, mark.
/// A failed transition is recorded with its error and answered with a 500 so
/// Stripe redelivers; `has_processed` ignores errored rows, so the retry gets
/// another attempt at the transition.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
    else {
        return JsonResponse::bad_request("Missing Stripe signature").into_response();
    };

    let event = match state.stripe.verify_webhook(&body, signature) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "webhook signature verification failed");
            return JsonResponse::bad_request("Invalid webhook signature").into_response();
        }
    };

    match state.billing_events.has_processed(&event.id).await {
        Ok(true) => {
            return (
                StatusCode::OK,
                Json(json!({ "received": true, "cached": true })),
            )
                .into_response();
        }
        Ok(false) => {}
        Err(err) => {
            error!(error = %err, event_id = %event.id, "event ledger lookup failed");
            return JsonResponse::server_error("Event ledger unavailable").into_response();
        }
    }

    // Unique constraint on event_id makes a racing duplicate insert a no-op.
    if let Err(err) = state
        .billing_events
        .record_event(&event.id, &event.r#type, &event.payload)
        .await
    {
        error!(error = %err, event_id = %event.id, "failed to record billing event");
        return JsonResponse::server_error("Event ledger unavailable").into_response();
    }

    let parsed = BillingEvent::from_stripe(&event);
    let outcome = apply_event(&state.accounts, &state.stripe, &state.mailer, parsed).await;

    let error_text = outcome.as_ref().err().map(|e| e.to_string());
    if let Err(err) = state
        .billing_events
        .mark_processed(&event.id, error_text.as_deref())
        .await
    {
        error!(error = %err, event_id = %event.id, "failed to mark billing event processed");
    }

    match outcome {
        Ok(()) => (StatusCode::OK, Json(json!({ "received": true }))).into_response(),
        Err(err) => {
            error!(error = %err, event_id = %event.id, event_type = %event.r#type, "billing event processing failed");
            JsonResponse::server_error("Event processing failed").into_response()
        }
    }
}
