use axum_extra::extract::cookie::{Cookie, SameSite};
use time::{Duration, OffsetDateTime};

use crate::models::account::Account;
use crate::routes::auth::claims::{Claims, TokenUse};
use crate::session::AUTH_COOKIE;
use crate::state::AppState;
use crate::utils::jwt::create_jwt;

pub mod claims;
pub mod login;
pub mod logout;
pub mod signup;

const ACCESS_TOKEN_HOURS: i64 = 24;

pub(crate) fn issue_access_token(
    state: &AppState,
    account: &Account,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (OffsetDateTime::now_utc() + Duration::hours(ACCESS_TOKEN_HOURS)).unix_timestamp();
    let claims = Claims {
        id: account.id.to_string(),
        email: account.email.clone(),
        exp: exp as usize,
        role: account.role,
        iss: String::new(),
        aud: String::new(),
        token_use: TokenUse::Access,
    };
    create_jwt(
        claims,
        &state.jwt_keys,
        &state.config.jwt_issuer,
        &state.config.jwt_audience,
    )
}

pub(crate) fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

pub(crate) fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, ""))
        .path("/")
        .http_only(true)
        .build()
}
