use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use time::OffsetDateTime;

/// One row per Stripe event delivery. `event_id` is unique; the insert-time
/// constraint is what makes webhook processing at-most-once.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct BillingEventRecord {
    pub event_id: String,
    pub event_type: String,
    pub payload: Value,
    pub processed: bool,
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub processed_at: Option<OffsetDateTime>,
}
