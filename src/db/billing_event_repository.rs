use async_trait::async_trait;
use serde_json::Value;

use crate::models::billing_event::BillingEventRecord;

/// Idempotency ledger for inbound Stripe events.
///
/// `has_processed` is a fast-path optimization; the unique constraint on
/// `event_id` at insert time is the correctness guarantee for racing duplicate
/// deliveries. An event recorded with an error does NOT count as processed, so
/// a provider retry gets another attempt at the transition.
#[async_trait]
pub trait BillingEventRepository: Send + Sync {
    async fn has_processed(&self, event_id: &str) -> Result<bool, sqlx::Error>;

    /// Insert the event before any side-effecting work. A duplicate insert is
    /// a benign race and is swallowed, not surfaced.
    async fn record_event(
        &self,
        event_id: &str,
        event_type: &str,
        payload: &Value,
    ) -> Result<(), sqlx::Error>;

    async fn mark_processed(
        &self,
        event_id: &str,
        error: Option<&str>,
    ) -> Result<(), sqlx::Error>;

    /// Newest-first slice of the ledger, for admin inspection of failed or
    /// pending deliveries.
    async fn list_recent_events(&self, limit: i64) -> Result<Vec<BillingEventRecord>, sqlx::Error>;
}
