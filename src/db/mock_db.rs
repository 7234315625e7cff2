use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::account_repository::AccountRepository;
use crate::db::admin_unlock_repository::AdminUnlockRepository;
use crate::db::billing_event_repository::BillingEventRepository;
use crate::db::horse_repository::HorseRepository;
use crate::models::account::{Account, SubscriptionPlan, SubscriptionStatus};
use crate::models::admin_unlock::AdminSession;
use crate::models::billing_event::BillingEventRecord;
use crate::models::horse::{Horse, NewHorse};

/// In-memory account store used by route and lifecycle tests. Mutations go
/// through the same methods the Postgres repository implements, so tests
/// observe the resulting `Account` rows directly.
#[derive(Default)]
pub struct MockDb {
    pub accounts: Mutex<Vec<Account>>,
    pub should_fail: bool,
    pub activate_calls: Mutex<Vec<(Uuid, SubscriptionPlan, Option<String>, String)>>,
    pub status_updates: Mutex<Vec<(Uuid, SubscriptionStatus, Option<OffsetDateTime>)>>,
    pub payments_received: Mutex<Vec<(Uuid, OffsetDateTime)>>,
}

impl MockDb {
    pub fn with_account(account: Account) -> Self {
        let db = Self::default();
        db.accounts.lock().unwrap().push(account);
        db
    }

    pub fn account(&self, account_id: Uuid) -> Option<Account> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
    }

    fn fail_check(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for MockDb {
    async fn find_account_by_id(&self, account_id: Uuid) -> Result<Option<Account>, sqlx::Error> {
        self.fail_check()?;
        Ok(self.account(account_id))
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, sqlx::Error> {
        self.fail_check()?;
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn is_email_taken(&self, email: &str) -> Result<bool, sqlx::Error> {
        self.fail_check()?;
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .any(|a| a.email.eq_ignore_ascii_case(email)))
    }

    async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        trial_ends_at: OffsetDateTime,
    ) -> Result<Account, sqlx::Error> {
        self.fail_check()?;
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
            role: None,
            subscription_status: SubscriptionStatus::Trial,
            subscription_plan: None,
            trial_ends_at: Some(trial_ends_at),
            subscription_ends_at: None,
            last_payment_at: None,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            is_active: true,
            is_suspended: false,
            suspension_reason: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.accounts.lock().unwrap().push(account.clone());
        Ok(account)
    }

    async fn find_account_id_by_stripe_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        self.fail_check()?;
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.stripe_customer_id.as_deref() == Some(customer_id))
            .map(|a| a.id))
    }

    async fn find_account_id_by_stripe_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        self.fail_check()?;
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.stripe_subscription_id.as_deref() == Some(subscription_id))
            .map(|a| a.id))
    }

    async fn set_stripe_customer_id(
        &self,
        account_id: Uuid,
        customer_id: &str,
    ) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        if let Some(a) = self
            .accounts
            .lock()
            .unwrap()
            .iter_mut()
            .find(|a| a.id == account_id)
        {
            a.stripe_customer_id = Some(customer_id.to_string());
        }
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
        self.fail_check()?;
        self.activate_calls.lock().unwrap().push((
            account_id,
            plan,
            customer_id.map(str::to_owned),
            subscription_id.to_string(),
        ));
        if let Some(a) = self
            .accounts
            .lock()
            .unwrap()
            .iter_mut()
            .find(|a| a.id == account_id)
        {
            a.subscription_status = SubscriptionStatus::Active;
            a.subscription_plan = Some(plan);
            if let Some(cid) = customer_id {
                a.stripe_customer_id = Some(cid.to_string());
            }
            a.stripe_subscription_id = Some(subscription_id.to_string());
            a.last_payment_at = Some(paid_at);
            a.subscription_ends_at = None;
        }
        Ok(())
    }

    async fn set_subscription_status(
        &self,
        account_id: Uuid,
        status: SubscriptionStatus,
        subscription_ends_at: Option<OffsetDateTime>,
    ) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        self.status_updates
            .lock()
            .unwrap()
            .push((account_id, status, subscription_ends_at));
        if let Some(a) = self
            .accounts
            .lock()
            .unwrap()
            .iter_mut()
            .find(|a| a.id == account_id)
        {
            a.subscription_status = status;
            a.subscription_ends_at = subscription_ends_at;
        }
        Ok(())
    }

    async fn mark_payment_received(
        &self,
        account_id: Uuid,
        paid_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        self.payments_received
            .lock()
            .unwrap()
            .push((account_id, paid_at));
        if let Some(a) = self
            .accounts
            .lock()
            .unwrap()
            .iter_mut()
            .find(|a| a.id == account_id)
        {
            a.subscription_status = SubscriptionStatus::Active;
            a.last_payment_at = Some(paid_at);
        }
        Ok(())
    }

    async fn suspend_account(&self, account_id: Uuid, reason: &str) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        if let Some(a) = self
            .accounts
            .lock()
            .unwrap()
            .iter_mut()
            .find(|a| a.id == account_id)
        {
            a.is_suspended = true;
            a.suspension_reason = Some(reason.to_string());
        }
        Ok(())
    }

    async fn reinstate_account(&self, account_id: Uuid) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        if let Some(a) = self
            .accounts
            .lock()
            .unwrap()
            .iter_mut()
            .find(|a| a.id == account_id)
        {
            a.is_suspended = false;
            a.suspension_reason = None;
        }
        Ok(())
    }

    async fn list_accounts(&self, limit: i64) -> Result<Vec<Account>, sqlx::Error> {
        self.fail_check()?;
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts.iter().take(limit as usize).cloned().collect())
    }
}

#[derive(Default)]
pub struct MockBillingEventRepository {
    pub events: Mutex<HashMap<String, BillingEventRecord>>,
    pub checks: Mutex<usize>,
    pub inserts: Mutex<usize>,
}

impl MockBillingEventRepository {
    pub fn recorded_event_ids(&self) -> Vec<String> {
        self.events.lock().unwrap().keys().cloned().collect()
    }

    pub fn error_for(&self, event_id: &str) -> Option<String> {
        self.events
            .lock()
            .unwrap()
            .get(event_id)
            .and_then(|record| record.error.clone())
    }
}

#[async_trait]
impl BillingEventRepository for MockBillingEventRepository {
    async fn has_processed(&self, event_id: &str) -> Result<bool, sqlx::Error> {
        *self.checks.lock().unwrap() += 1;
        Ok(self
            .events
            .lock()
            .unwrap()
            .get(event_id)
            .map(|record| record.processed && record.error.is_none())
            .unwrap_or(false))
    }

    async fn record_event(
        &self,
        event_id: &str,
        event_type: &str,
        payload: &Value,
    ) -> Result<(), sqlx::Error> {
        *self.inserts.lock().unwrap() += 1;
        // ON CONFLICT DO NOTHING semantics
        self.events
            .lock()
            .unwrap()
            .entry(event_id.to_string())
            .or_insert(BillingEventRecord {
                event_id: event_id.to_string(),
                event_type: event_type.to_string(),
                payload: payload.clone(),
                processed: false,
                error: None,
                received_at: OffsetDateTime::now_utc(),
                processed_at: None,
            });
        Ok(())
    }

    async fn mark_processed(
        &self,
        event_id: &str,
        error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        if let Some(record) = self.events.lock().unwrap().get_mut(event_id) {
            record.processed = true;
            record.error = error.map(|e| e.to_string());
            record.processed_at = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn list_recent_events(&self, limit: i64) -> Result<Vec<BillingEventRecord>, sqlx::Error> {
        let mut records: Vec<BillingEventRecord> =
            self.events.lock().unwrap().values().cloned().collect();
        records.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        records.truncate(limit as usize);
        Ok(records)
    }
}

#[derive(Default)]
pub struct MockAdminUnlockRepository {
    pub attempts: Mutex<HashMap<Uuid, (i32, Option<OffsetDateTime>)>>,
    pub sessions: Mutex<HashMap<Uuid, AdminSession>>,
}

#[async_trait]
impl AdminUnlockRepository for MockAdminUnlockRepository {
    async fn get_attempts(
        &self,
        account_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<i32, sqlx::Error> {
        let mut attempts = self.attempts.lock().unwrap();
        let Some((count, locked_until)) = attempts.get(&account_id).copied() else {
            return Ok(0);
        };
        if let Some(until) = locked_until {
            if until <= now {
                attempts.insert(account_id, (0, None));
                return Ok(0);
            }
        }
        Ok(count)
    }

    async fn increment_attempts(
        &self,
        account_id: Uuid,
        _now: OffsetDateTime,
    ) -> Result<i32, sqlx::Error> {
        let mut attempts = self.attempts.lock().unwrap();
        let entry = attempts.entry(account_id).or_insert((0, None));
        entry.0 += 1;
        Ok(entry.0)
    }

    async fn set_lockout(
        &self,
        account_id: Uuid,
        locked_until: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        let mut attempts = self.attempts.lock().unwrap();
        let entry = attempts.entry(account_id).or_insert((0, None));
        entry.1 = Some(locked_until);
        Ok(())
    }

    async fn get_lockout_until(
        &self,
        account_id: Uuid,
    ) -> Result<Option<OffsetDateTime>, sqlx::Error> {
        Ok(self
            .attempts
            .lock()
            .unwrap()
            .get(&account_id)
            .and_then(|(_, until)| *until))
    }

    async fn reset_attempts(&self, account_id: Uuid) -> Result<(), sqlx::Error> {
        self.attempts.lock().unwrap().insert(account_id, (0, None));
        Ok(())
    }

    async fn create_session(
        &self,
        account_id: Uuid,
        expires_at: OffsetDateTime,
    ) -> Result<AdminSession, sqlx::Error> {
        let session = AdminSession {
            account_id,
            expires_at,
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(account_id, session.clone());
        Ok(session)
    }

    async fn find_active_session(
        &self,
        account_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Option<AdminSession>, sqlx::Error> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(&account_id)
            .filter(|s| s.is_live(now))
            .cloned())
    }

    async fn delete_session(&self, account_id: Uuid) -> Result<(), sqlx::Error> {
        self.sessions.lock().unwrap().remove(&account_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockHorseRepository {
    pub horses: Mutex<Vec<Horse>>,
}

#[async_trait]
impl HorseRepository for MockHorseRepository {
    async fn list_horses_for_owner(&self, owner_id: Uuid) -> Result<Vec<Horse>, sqlx::Error> {
        Ok(self
            .horses
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn create_horse(&self, owner_id: Uuid, horse: &NewHorse) -> Result<Horse, sqlx::Error> {
        let created = Horse {
            id: Uuid::new_v4(),
            owner_id,
            name: horse.name.clone(),
            breed: horse.breed.clone(),
            date_of_birth: horse.date_of_birth,
            created_at: OffsetDateTime::now_utc(),
        };
        self.horses.lock().unwrap().push(created.clone());
        Ok(created)
    }
}
