use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::billing::access::has_subscription_access;
use crate::models::account::{Account, SubscriptionStatus};
use crate::responses::JsonResponse;
use crate::session::AuthSession;
use crate::state::AppState;

pub(crate) async fn load_account(
    state: &AppState,
    session: &AuthSession,
) -> Result<Account, Response> {
    let account_id = Uuid::parse_str(&session.0.id)
        .map_err(|_| JsonResponse::unauthorized("Invalid session").into_response())?;

    let account = state
        .accounts
        .find_account_by_id(account_id)
        .await
        .map_err(|err| {
            warn!(error = %err, "account lookup failed");
            JsonResponse::server_error("Account lookup failed").into_response()
        })?;

    account.ok_or_else(|| JsonResponse::unauthorized("Unknown account").into_response())
}

/// Rejects requests from accounts whose trial has lapsed or whose
/// subscription is no longer paid up. The rejection code tells the client
/// which remediation screen to show.
pub async fn require_subscription(
    State(state): State<AppState>,
    session: AuthSession,
    request: Request,
    next: Next,
) -> Response {
    let account = match load_account(&state, &session).await {
        Ok(account) => account,
        Err(response) => return response,
    };

    if account.is_suspended {
        return JsonResponse::forbidden_with_code("Account suspended", "account_suspended")
            .into_response();
    }

    if has_subscription_access(Some(&account), OffsetDateTime::now_utc()) {
        return next.run(request).await;
    }

    let (message, code) = match account.subscription_status {
        SubscriptionStatus::Trial => ("Trial expired", "trial_expired"),
        SubscriptionStatus::Overdue | SubscriptionStatus::Expired => {
            ("Subscription expired", "subscription_expired")
        }
        _ => ("Subscription required", "subscription_required"),
    };
    JsonResponse::forbidden_with_code(message, code).into_response()
}

/// Admin routes need the admin role *and* a live unlock session; role alone
/// is not enough.
pub async fn require_admin_unlock(
    State(state): State<AppState>,
    session: AuthSession,
    request: Request,
    next: Next,
) -> Response {
    let account = match load_account(&state, &session).await {
        Ok(account) => account,
        Err(response) => return response,
    };

    if account.is_suspended {
        return JsonResponse::forbidden_with_code("Account suspended", "account_suspended")
            .into_response();
    }
    if !account.is_admin() {
        return JsonResponse::forbidden_with_code("Administrator role required", "admin_required")
            .into_response();
    }

    let unlocked = match state
        .admin_unlock
        .find_active_session(account.id, OffsetDateTime::now_utc())
        .await
    {
        Ok(session) => session.is_some(),
        Err(err) => {
            warn!(error = %err, "admin session lookup failed");
            return JsonResponse::server_error("Admin session lookup failed").into_response();
        }
    };
    if !unlocked {
        return JsonResponse::forbidden_with_code("Admin unlock required", "admin_unlock_required")
            .into_response();
    }

    next.run(request).await
}
