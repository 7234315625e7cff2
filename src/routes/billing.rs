use std::collections::BTreeMap;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{error, warn};

use crate::billing::access::has_subscription_access;
use crate::models::account::{SubscriptionPlan, SubscriptionStatus};
use crate::responses::JsonResponse;
use crate::routes::gate::load_account;
use crate::services::stripe::CreateCheckoutSessionRequest;
use crate::session::AuthSession;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub plan: SubscriptionPlan,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

pub async fn create_checkout_session(
    State(state): State<AppState>,
    session: AuthSession,
    Json(payload): Json<CheckoutRequest>,
) -> Response {
    let account = match load_account(&state, &session).await {
        Ok(account) => account,
        Err(response) => return response,
    };

    let price = match payload.plan {
        SubscriptionPlan::Monthly => state.config.stripe.monthly_price_id.clone(),
        SubscriptionPlan::Yearly => state.config.stripe.yearly_price_id.clone(),
    };

    // First checkout for this account: create the Stripe customer up front so
    // the webhook can resolve the account by customer id later.
    let customer_id = match account.stripe_customer_id.clone() {
        Some(id) => id,
        None => {
            let id = match state
                .stripe
                .create_customer(&account.email, Some(&account.name))
                .await
            {
                Ok(id) => id,
                Err(err) => {
                    warn!(error = %err, "stripe customer creation failed");
                    return JsonResponse::service_unavailable("Billing temporarily unavailable")
                        .into_response();
                }
            };
            if let Err(err) = state.accounts.set_stripe_customer_id(account.id, &id).await {
                error!(error = %err, "failed to store stripe customer id");
                return JsonResponse::server_error("Checkout failed").into_response();
            }
            id
        }
    };

    let origin = &state.config.frontend_origin;
    let mut metadata = BTreeMap::new();
    metadata.insert("account_id".to_string(), account.id.to_string());

    let request = CreateCheckoutSessionRequest {
        success_url: format!("{origin}/billing/success"),
        cancel_url: format!("{origin}/billing/cancel"),
        price,
        client_reference_id: Some(account.id.to_string()),
        customer: Some(customer_id),
        metadata: Some(metadata),
    };

    match state.stripe.create_checkout_session(request).await {
        Ok(checkout) => match checkout.url {
            Some(url) => Json(CheckoutResponse { url }).into_response(),
            None => {
                warn!(session_id = %checkout.id, "checkout session created without a redirect url");
                JsonResponse::service_unavailable("Billing temporarily unavailable").into_response()
            }
        },
        Err(err) => {
            warn!(error = %err, "checkout session creation failed");
            JsonResponse::service_unavailable("Billing temporarily unavailable").into_response()
        }
    }
}

pub async fn create_portal_session(
    State(state): State<AppState>,
    session: AuthSession,
) -> Response {
    let account = match load_account(&state, &session).await {
        Ok(account) => account,
        Err(response) => return response,
    };

    let Some(customer_id) = account.stripe_customer_id else {
        return JsonResponse::bad_request("No active subscription").into_response();
    };

    let return_url = format!("{}/settings/billing", state.config.frontend_origin);
    match state
        .stripe
        .create_billing_portal_session(&customer_id, &return_url)
        .await
    {
        Ok(url) => Json(json!({ "url": url })).into_response(),
        Err(err) => {
            warn!(error = %err, "billing portal session creation failed");
            JsonResponse::service_unavailable("Billing temporarily unavailable").into_response()
        }
    }
}

/// Projection of the caller's own subscription state.
#[derive(Serialize, Deserialize)]
pub struct AccessSummary {
    pub subscription_status: SubscriptionStatus,
    pub subscription_plan: Option<SubscriptionPlan>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_ends_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub subscription_ends_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_payment_at: Option<OffsetDateTime>,
    pub has_active_subscription: bool,
}

pub async fn account_access(State(state): State<AppState>, session: AuthSession) -> Response {
    let account = match load_account(&state, &session).await {
        Ok(account) => account,
        Err(response) => return response,
    };

    let summary = AccessSummary {
        subscription_status: account.subscription_status,
        subscription_plan: account.subscription_plan,
        trial_ends_at: account.trial_ends_at,
        subscription_ends_at: account.subscription_ends_at,
        last_payment_at: account.last_payment_at,
        has_active_subscription: has_subscription_access(Some(&account), OffsetDateTime::now_utc()),
    };
    Json(summary).into_response()
}
