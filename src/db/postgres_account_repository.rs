use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::account_repository::AccountRepository;
use crate::models::account::{Account, SubscriptionPlan, SubscriptionStatus};

const ACCOUNT_COLUMNS: &str = r#"
    id, email, password_hash, name, role,
    subscription_status, subscription_plan,
    trial_ends_at, subscription_ends_at, last_payment_at,
    stripe_customer_id, stripe_subscription_id,
    is_active, is_suspended, suspension_reason, created_at
"#;

pub struct PostgresAccountRepository {
    pub pool: PgPool,
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_account_by_id(&self, account_id: Uuid) -> Result<Option<Account>, sqlx::Error> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        sqlx::query_as::<_, Account>(&query)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, sqlx::Error> {
        let query =
            format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE lower(email) = lower($1)");
        sqlx::query_as::<_, Account>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn is_email_taken(&self, email: &str) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM accounts WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .is_some();
        Ok(exists)
    }

    async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        trial_ends_at: OffsetDateTime,
    ) -> Result<Account, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO accounts (email, password_hash, name, trial_ends_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(email)
            .bind(password_hash)
            .bind(name)
            .bind(trial_ends_at)
            .fetch_one(&self.pool)
            .await
    }

    async fn find_account_id_by_stripe_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM accounts WHERE stripe_customer_id = $1")
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_account_id_by_stripe_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM accounts WHERE stripe_subscription_id = $1",
        )
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_stripe_customer_id(
        &self,
        account_id: Uuid,
        customer_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE accounts SET stripe_customer_id = $2 WHERE id = $1")
            .bind(account_id)
            .bind(customer_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn activate_subscription(
        &self,
        account_id: Uuid,
        plan: SubscriptionPlan,
        customer_id: Option<&str>,
        subscription_id: &str,
        paid_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET subscription_status = 'active',
                subscription_plan = $2,
                stripe_customer_id = COALESCE($3, stripe_customer_id),
                stripe_subscription_id = $4,
                last_payment_at = $5,
                subscription_ends_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .bind(plan)
        .bind(customer_id)
        .bind(subscription_id)
        .bind(paid_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_subscription_status(
        &self,
        account_id: Uuid,
        status: SubscriptionStatus,
        subscription_ends_at: Option<OffsetDateTime>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET subscription_status = $2, subscription_ends_at = $3
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .bind(status)
        .bind(subscription_ends_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_payment_received(
        &self,
        account_id: Uuid,
        paid_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET subscription_status = 'active', last_payment_at = $2
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .bind(paid_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn suspend_account(&self, account_id: Uuid, reason: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE accounts SET is_suspended = TRUE, suspension_reason = $2 WHERE id = $1",
        )
        .bind(account_id)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reinstate_account(&self, account_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE accounts SET is_suspended = FALSE, suspension_reason = NULL WHERE id = $1",
        )
        .bind(account_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_accounts(&self, limit: i64) -> Result<Vec<Account>, sqlx::Error> {
        let query = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at DESC LIMIT $1"
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }
}
