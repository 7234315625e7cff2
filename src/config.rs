use std::env;

use anyhow::Context;

pub struct StripeSettings {
    pub secret_key: String,
    pub webhook_secret: String,
    pub monthly_price_id: String,
    pub yearly_price_id: String,
}

pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub stripe: StripeSettings,
    /// Argon2 hash of the secondary admin-mode password. Independent of
    /// primary auth; only the unlock challenge checks it.
    pub admin_mode_password_hash: String,
    pub auth_cookie_secure: bool,
    pub jwt_issuer: String,
    pub jwt_audience: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok(); // Load .env file

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let frontend_origin = env::var("FRONTEND_ORIGIN").context("FRONTEND_ORIGIN must be set")?;

        let stripe = StripeSettings {
            secret_key: env::var("STRIPE_SECRET_KEY").context("STRIPE_SECRET_KEY must be set")?,
            webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .context("STRIPE_WEBHOOK_SECRET must be set")?,
            monthly_price_id: env::var("STRIPE_MONTHLY_PRICE_ID")
                .context("STRIPE_MONTHLY_PRICE_ID must be set")?,
            yearly_price_id: env::var("STRIPE_YEARLY_PRICE_ID")
                .context("STRIPE_YEARLY_PRICE_ID must be set")?,
        };

        let admin_mode_password_hash = env::var("ADMIN_MODE_PASSWORD_HASH")
            .context("ADMIN_MODE_PASSWORD_HASH must be set")?;

        let auth_cookie_secure = env::var("AUTH_COOKIE_SECURE")
            .map(|v| v != "false")
            .unwrap_or(true);

        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "paddock".to_string());
        let jwt_audience = env::var("JWT_AUDIENCE").unwrap_or_else(|_| "paddock-app".to_string());

        Ok(Config {
            database_url,
            frontend_origin,
            stripe,
            admin_mode_password_hash,
            auth_cookie_secure,
            jwt_issuer,
            jwt_audience,
        })
    }
}
