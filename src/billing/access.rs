use time::OffsetDateTime;

use crate::models::account::{Account, SubscriptionStatus};

/// Whether the caller may use subscription-gated features.
///
/// Pure and total: admins always pass, `active` passes, `trial` passes only
/// while `trial_ends_at` is strictly in the future. Everything else is denied.
pub fn has_subscription_access(account: Option<&Account>, now: OffsetDateTime) -> bool {
    let Some(account) = account else {
        return false;
    };

    if account.is_admin() {
        return true;
    }

    match account.subscription_status {
        SubscriptionStatus::Active => true,
        SubscriptionStatus::Trial => account
            .trial_ends_at
            .map(|ends| ends > now)
            .unwrap_or(false),
        SubscriptionStatus::Cancelled
        | SubscriptionStatus::Overdue
        | SubscriptionStatus::Expired => false,
    }
}
