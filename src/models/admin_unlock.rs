use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Failed attempts allowed before a lockout is imposed.
pub const MAX_UNLOCK_ATTEMPTS: i32 = 5;
/// Lockout duration once the limit is exceeded.
pub const LOCKOUT_MINUTES: i64 = 15;
/// Lifetime of an admin session created by a successful unlock.
pub const ADMIN_SESSION_MINUTES: i64 = 30;

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct AdminUnlockAttempt {
    pub account_id: Uuid,
    pub attempts: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub locked_until: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_attempt_at: OffsetDateTime,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct AdminSession {
    pub account_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AdminSession {
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now
    }
}
