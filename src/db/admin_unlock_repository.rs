use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::admin_unlock::AdminSession;

/// Storage for the admin-unlock throttle and the short-lived admin sessions a
/// successful unlock creates. Expiry is lazy: a read that observes an elapsed
/// lockout resets the counter in place, so no background sweep is needed.
#[async_trait]
pub trait AdminUnlockRepository: Send + Sync {
    /// Current attempt count; 0 (after a reset) when a lockout has elapsed.
    async fn get_attempts(&self, account_id: Uuid, now: OffsetDateTime)
        -> Result<i32, sqlx::Error>;

    /// Create-or-increment; returns the new count.
    async fn increment_attempts(
        &self,
        account_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<i32, sqlx::Error>;

    async fn set_lockout(
        &self,
        account_id: Uuid,
        locked_until: OffsetDateTime,
    ) -> Result<(), sqlx::Error>;

    async fn get_lockout_until(
        &self,
        account_id: Uuid,
    ) -> Result<Option<OffsetDateTime>, sqlx::Error>;

    async fn reset_attempts(&self, account_id: Uuid) -> Result<(), sqlx::Error>;

    /// Replaces any prior session row for the account; at most one live
    /// session per account.
    async fn create_session(
        &self,
        account_id: Uuid,
        expires_at: OffsetDateTime,
    ) -> Result<AdminSession, sqlx::Error>;

    async fn find_active_session(
        &self,
        account_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Option<AdminSession>, sqlx::Error>;

    async fn delete_session(&self, account_id: Uuid) -> Result<(), sqlx::Error>;
}
