use std::sync::Arc;

use crate::config::Config;
use crate::db::account_repository::AccountRepository;
use crate::db::admin_unlock_repository::AdminUnlockRepository;
use crate::db::billing_event_repository::BillingEventRepository;
use crate::db::horse_repository::HorseRepository;
use crate::services::smtp_mailer::Mailer;
use crate::services::stripe::StripeService;
use crate::utils::jwt::JwtKeys;

/// Shared handles for every request handler. All data access and
/// third-party calls go through the trait objects here, so tests can
/// swap in mocks without touching the routing layer.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountRepository>,
    pub billing_events: Arc<dyn BillingEventRepository>,
    pub admin_unlock: Arc<dyn AdminUnlockRepository>,
    pub horses: Arc<dyn HorseRepository>,
    pub stripe: Arc<dyn StripeService>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
    pub jwt_keys: Arc<JwtKeys>,
}

#[cfg(test)]
pub mod test_support {
    use std::sync::Arc;

    use super::AppState;
    use crate::config::{Config, StripeSettings};
    use crate::db::mock_db::{
        MockAdminUnlockRepository, MockBillingEventRepository, MockDb, MockHorseRepository,
    };
    use crate::services::smtp_mailer::mock_mailer::MockMailer;
    use crate::services::stripe::mock::MockStripeService;
    use crate::utils::jwt::JwtKeys;

    pub fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/paddock_test".into(),
            frontend_origin: "http://localhost:5173".into(),
            stripe: StripeSettings {
                secret_key: "sk_test_123".into(),
                webhook_secret: "whsec_test_123".into(),
                monthly_price_id: "price_monthly_test".into(),
                yearly_price_id: "price_yearly_test".into(),
            },
            admin_mode_password_hash: String::new(),
            auth_cookie_secure: false,
            jwt_issuer: "paddock".into(),
            jwt_audience: "paddock-app".into(),
        }
    }

    pub fn test_state(db: MockDb) -> AppState {
        test_state_with(
            Arc::new(db),
            Arc::new(MockBillingEventRepository::default()),
            Arc::new(MockAdminUnlockRepository::default()),
            Arc::new(MockStripeService::new()),
            Arc::new(MockMailer::default()),
        )
    }

    pub fn test_state_with(
        db: Arc<MockDb>,
        billing_events: Arc<MockBillingEventRepository>,
        admin_unlock: Arc<MockAdminUnlockRepository>,
        stripe: Arc<MockStripeService>,
        mailer: Arc<MockMailer>,
    ) -> AppState {
        AppState {
            accounts: db,
            billing_events,
            admin_unlock,
            horses: Arc::new(MockHorseRepository::default()),
            stripe,
            mailer,
            config: Arc::new(test_config()),
            jwt_keys: Arc::new(
                JwtKeys::from_secret("0123456789abcdef0123456789abcdef")
                    .expect("test secret is valid"),
            ),
        }
    }
}
