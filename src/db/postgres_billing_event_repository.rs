use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use crate::db::billing_event_repository::BillingEventRepository;
use crate::models::billing_event::BillingEventRecord;

pub struct PostgresBillingEventRepository {
    pub pool: PgPool,
}

#[async_trait]
impl BillingEventRepository for PostgresBillingEventRepository {
    async fn has_processed(&self, event_id: &str) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM billing_events WHERE event_id = $1 AND processed AND error IS NULL",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?
        .is_some();

        Ok(exists)
    }

    async fn record_event(
        &self,
        event_id: &str,
        event_type: &str,
        payload: &Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO billing_events (event_id, event_type, payload)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_processed(
        &self,
        event_id: &str,
        error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE billing_events
            SET processed = TRUE, error = $2, processed_at = now()
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_recent_events(&self, limit: i64) -> Result<Vec<BillingEventRecord>, sqlx::Error> {
        sqlx::query_as::<_, BillingEventRecord>(
            r#"
            SELECT event_id, event_type, payload, processed, error, received_at, processed_at
            FROM billing_events
            ORDER BY received_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
