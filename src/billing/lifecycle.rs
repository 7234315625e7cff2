use std::sync::Arc;

use serde_json::Value;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::account_repository::AccountRepository;
use crate::models::account::{SubscriptionPlan, SubscriptionStatus};
use crate::services::smtp_mailer::Mailer;
use crate::services::stripe::{StripeEvent, StripeService, StripeServiceError};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Stripe(#[from] StripeServiceError),
}

fn jget<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(key))
}

fn get_str(value: &Value, path: &[&str]) -> Option<String> {
    jget(value, path).and_then(Value::as_str).map(str::to_owned)
}

fn get_i64(value: &Value, path: &[&str]) -> Option<i64> {
    jget(value, path).and_then(Value::as_i64)
}

fn get_bool(value: &Value, path: &[&str]) -> Option<bool> {
    jget(value, path).and_then(Value::as_bool)
}

/// A verified provider event narrowed to the closed set of types the
/// lifecycle reacts to. Parsing happens once at the boundary; everything
/// downstream pattern-matches instead of re-inspecting JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    CheckoutCompleted {
        /// Account id carried on the checkout session itself, when present.
        account_hint: Option<Uuid>,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    },
    SubscriptionUpdated {
        subscription_id: String,
        provider_status: String,
        /// Scheduled cancellation time, already resolved from either
        /// `cancel_at` or `cancel_at_period_end` + `current_period_end`.
        cancel_at: Option<OffsetDateTime>,
    },
    SubscriptionDeleted {
        subscription_id: String,
    },
    InvoicePaymentSucceeded {
        subscription_id: Option<String>,
    },
    InvoicePaymentFailed {
        subscription_id: Option<String>,
    },
    Unhandled {
        event_type: String,
    },
}

impl BillingEvent {
    pub fn from_stripe(event: &StripeEvent) -> Self {
        let unhandled = || BillingEvent::Unhandled {
            event_type: event.r#type.clone(),
        };
        let object = match jget(&event.payload, &["data", "object"]) {
            Some(obj) => obj,
            None => return unhandled(),
        };

        match event.r#type.as_str() {
            "checkout.session.completed" => {
                let account_hint = get_str(object, &["metadata", "account_id"])
                    .or_else(|| get_str(object, &["client_reference_id"]))
                    .and_then(|s| Uuid::parse_str(&s).ok());
                BillingEvent::CheckoutCompleted {
                    account_hint,
                    customer_id: get_str(object, &["customer"]),
                    subscription_id: get_str(object, &["subscription"]),
                }
            }
            "customer.subscription.updated" => {
                let Some(subscription_id) = get_str(object, &["id"]) else {
                    return unhandled();
                };
                let cancel_at = get_i64(object, &["cancel_at"])
                    .or_else(|| {
                        get_bool(object, &["cancel_at_period_end"])
                            .filter(|set| *set)
                            .and_then(|_| get_i64(object, &["current_period_end"]))
                    })
                    .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok());
                BillingEvent::SubscriptionUpdated {
                    subscription_id,
                    provider_status: get_str(object, &["status"]).unwrap_or_default(),
                    cancel_at,
                }
            }
            "customer.subscription.deleted" => match get_str(object, &["id"]) {
                Some(subscription_id) => BillingEvent::SubscriptionDeleted { subscription_id },
                None => unhandled(),
            },
            "invoice.payment_succeeded" => BillingEvent::InvoicePaymentSucceeded {
                subscription_id: get_str(object, &["subscription"]),
            },
            "invoice.payment_failed" => BillingEvent::InvoicePaymentFailed {
                subscription_id: get_str(object, &["subscription"]),
            },
            _ => unhandled(),
        }
    }
}

/// Provider statuses we don't map explicitly (`trialing`, `incomplete`,
/// `active`, ...) all count as a live subscription.
pub fn map_provider_status(provider_status: &str) -> SubscriptionStatus {
    match provider_status {
        "past_due" => SubscriptionStatus::Overdue,
        "canceled" | "unpaid" => SubscriptionStatus::Cancelled,
        "incomplete_expired" => SubscriptionStatus::Expired,
        _ => SubscriptionStatus::Active,
    }
}

pub fn plan_from_interval(interval: Option<&str>) -> SubscriptionPlan {
    match interval {
        Some("month") => SubscriptionPlan::Monthly,
        _ => SubscriptionPlan::Yearly,
    }
}

/// Apply one provider event to the account it references.
///
/// Events that match no stored account are acknowledged as no-ops so the
/// provider does not keep redelivering them. Errors from the database or the
/// provider API propagate to the webhook handler, which records them on the
/// event row.
pub async fn apply_event(
    accounts: &Arc<dyn AccountRepository>,
    stripe: &Arc<dyn StripeService>,
    mailer: &Arc<dyn Mailer>,
    event: BillingEvent,
) -> Result<(), LifecycleError> {
    let now = OffsetDateTime::now_utc();

    match event {
        BillingEvent::CheckoutCompleted {
            account_hint,
            customer_id,
            subscription_id,
        } => {
            let Some(subscription_id) = subscription_id else {
                warn!("checkout completed without a linked subscription; ignoring");
                return Ok(());
            };

            let sub = stripe.get_subscription(&subscription_id).await?;
            let customer_id = customer_id.or_else(|| sub.customer_id.clone());

            // Resolution order: explicit hint on the session, then reverse
            // lookup by customer id, then by subscription id.
            let mut account_id = account_hint;
            if account_id.is_none() {
                if let Some(cid) = customer_id.as_deref() {
                    account_id = accounts.find_account_id_by_stripe_customer_id(cid).await?;
                }
            }
            if account_id.is_none() {
                account_id = accounts
                    .find_account_id_by_stripe_subscription_id(&subscription_id)
                    .await?;
            }
            let Some(account_id) = account_id else {
                info!(subscription = %subscription_id, "checkout session matches no account; ignoring");
                return Ok(());
            };
            let Some(account) = accounts.find_account_by_id(account_id).await? else {
                info!(%account_id, "checkout session references unknown account; ignoring");
                return Ok(());
            };

            let plan = plan_from_interval(sub.interval.as_deref());
            accounts
                .activate_subscription(
                    account_id,
                    plan,
                    customer_id.as_deref(),
                    &subscription_id,
                    now,
                )
                .await?;
            info!(%account_id, %plan, "subscription activated");

            // Confirmation email runs on its own task; a slow or failing
            // send never blocks or rolls back the activation.
            let mailer = Arc::clone(mailer);
            let email = account.email;
            let plan_name = plan.to_string();
            tokio::spawn(async move {
                if let Err(err) = mailer
                    .send_payment_confirmation_email(&email, &plan_name)
                    .await
                {
                    warn!(error = %err, email = %email, "payment confirmation email failed");
                }
            });
            Ok(())
        }

        BillingEvent::SubscriptionUpdated {
            subscription_id,
            provider_status,
            cancel_at,
        } => {
            let Some(account_id) = accounts
                .find_account_id_by_stripe_subscription_id(&subscription_id)
                .await?
            else {
                info!(subscription = %subscription_id, "subscription update matches no account; ignoring");
                return Ok(());
            };
            let status = map_provider_status(&provider_status);
            accounts
                .set_subscription_status(account_id, status, cancel_at)
                .await?;
            info!(%account_id, %status, provider_status = %provider_status, "subscription status updated");
            Ok(())
        }

        BillingEvent::SubscriptionDeleted { subscription_id } => {
            let Some(account_id) = accounts
                .find_account_id_by_stripe_subscription_id(&subscription_id)
                .await?
            else {
                info!(subscription = %subscription_id, "subscription deletion matches no account; ignoring");
                return Ok(());
            };
            accounts
                .set_subscription_status(account_id, SubscriptionStatus::Cancelled, Some(now))
                .await?;
            info!(%account_id, "subscription cancelled");
            Ok(())
        }

        BillingEvent::InvoicePaymentSucceeded { subscription_id } => {
            let Some(subscription_id) = subscription_id else {
                info!("invoice without a linked subscription; ignoring");
                return Ok(());
            };
            let Some(account_id) = accounts
                .find_account_id_by_stripe_subscription_id(&subscription_id)
                .await?
            else {
                info!(subscription = %subscription_id, "invoice matches no account; ignoring");
                return Ok(());
            };
            accounts.mark_payment_received(account_id, now).await?;
            info!(%account_id, "renewal payment recorded");
            Ok(())
        }

        BillingEvent::InvoicePaymentFailed { subscription_id } => {
            let Some(subscription_id) = subscription_id else {
                info!("failed invoice without a linked subscription; ignoring");
                return Ok(());
            };
            let Some(account_id) = accounts
                .find_account_id_by_stripe_subscription_id(&subscription_id)
                .await?
            else {
                info!(subscription = %subscription_id, "failed invoice matches no account; ignoring");
                return Ok(());
            };
            // Preserve any scheduled cancellation date while flipping to overdue.
            let ends_at = accounts
                .find_account_by_id(account_id)
                .await?
                .and_then(|a| a.subscription_ends_at);
            accounts
                .set_subscription_status(account_id, SubscriptionStatus::Overdue, ends_at)
                .await?;
            info!(%account_id, "payment failed, subscription overdue");
            Ok(())
        }

        BillingEvent::Unhandled { event_type } => {
            info!(%event_type, "unhandled billing event type");
            Ok(())
        }
    }
}
