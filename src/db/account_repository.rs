use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::account::{Account, SubscriptionPlan, SubscriptionStatus};

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_account_by_id(&self, account_id: Uuid) -> Result<Option<Account>, sqlx::Error>;
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, sqlx::Error>;
    async fn is_email_taken(&self, email: &str) -> Result<bool, sqlx::Error>;
    async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        trial_ends_at: OffsetDateTime,
    ) -> Result<Account, sqlx::Error>;

    async fn find_account_id_by_stripe_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Uuid>, sqlx::Error>;
    async fn find_account_id_by_stripe_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Uuid>, sqlx::Error>;
    async fn set_stripe_customer_id(
        &self,
        account_id: Uuid,
        customer_id: &str,
    ) -> Result<(), sqlx::Error>;

    /// Transition into `active` after a completed checkout: plan, provider
    /// identifiers and `last_payment_at` land together. A missing customer id
    /// leaves the stored one untouched rather than overwriting it.
    async fn activate_subscription(
        &self,
        account_id: Uuid,
        plan: SubscriptionPlan,
        customer_id: Option<&str>,
        subscription_id: &str,
        paid_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error>;

    /// Set status and overwrite `subscription_ends_at` (including clearing it).
    async fn set_subscription_status(
        &self,
        account_id: Uuid,
        status: SubscriptionStatus,
        subscription_ends_at: Option<OffsetDateTime>,
    ) -> Result<(), sqlx::Error>;

    /// Renewal payment observed: status back to `active`, stamp the payment.
    async fn mark_payment_received(
        &self,
        account_id: Uuid,
        paid_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error>;

    async fn suspend_account(&self, account_id: Uuid, reason: &str) -> Result<(), sqlx::Error>;
    async fn reinstate_account(&self, account_id: Uuid) -> Result<(), sqlx::Error>;
    async fn list_accounts(&self, limit: i64) -> Result<Vec<Account>, sqlx::Error>;
}
