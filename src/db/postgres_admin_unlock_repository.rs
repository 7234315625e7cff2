use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::admin_unlock_repository::AdminUnlockRepository;
use crate::models::admin_unlock::{AdminSession, AdminUnlockAttempt};

pub struct PostgresAdminUnlockRepository {
    pub pool: PgPool,
}

#[async_trait]
impl AdminUnlockRepository for PostgresAdminUnlockRepository {
    async fn get_attempts(
        &self,
        account_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<i32, sqlx::Error> {
        let row: Option<AdminUnlockAttempt> = sqlx::query_as(
            r#"
            SELECT account_id, attempts, locked_until, last_attempt_at
            FROM admin_unlock_attempts WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(0);
        };

        // Lazy expiry: an elapsed lockout resets the row at read time.
        if let Some(until) = row.locked_until {
            if until <= now {
                self.reset_attempts(account_id).await?;
                return Ok(0);
            }
        }

        Ok(row.attempts)
    }

    async fn increment_attempts(
        &self,
        account_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO admin_unlock_attempts (account_id, attempts, last_attempt_at)
            VALUES ($1, 1, $2)
            ON CONFLICT (account_id)
            DO UPDATE SET attempts = admin_unlock_attempts.attempts + 1, last_attempt_at = $2
            RETURNING attempts
            "#,
        )
        .bind(account_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_lockout(
        &self,
        account_id: Uuid,
        locked_until: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE admin_unlock_attempts SET locked_until = $2 WHERE account_id = $1")
            .bind(account_id)
            .bind(locked_until)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_lockout_until(
        &self,
        account_id: Uuid,
    ) -> Result<Option<OffsetDateTime>, sqlx::Error> {
        let row: Option<Option<OffsetDateTime>> = sqlx::query_scalar(
            "SELECT locked_until FROM admin_unlock_attempts WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.flatten())
    }

    async fn reset_attempts(&self, account_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE admin_unlock_attempts SET attempts = 0, locked_until = NULL WHERE account_id = $1",
        )
        .bind(account_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_session(
        &self,
        account_id: Uuid,
        expires_at: OffsetDateTime,
    ) -> Result<AdminSession, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Single live session per account: supersede any prior row.
        sqlx::query("DELETE FROM admin_sessions WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        let session: AdminSession = sqlx::query_as(
            r#"
            INSERT INTO admin_sessions (account_id, expires_at)
            VALUES ($1, $2)
            RETURNING account_id, expires_at
            "#,
        )
        .bind(account_id)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(session)
    }

    async fn find_active_session(
        &self,
        account_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Option<AdminSession>, sqlx::Error> {
        sqlx::query_as::<_, AdminSession>(
            "SELECT account_id, expires_at FROM admin_sessions WHERE account_id = $1 AND expires_at > $2",
        )
        .bind(account_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_session(&self, account_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM admin_sessions WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
