use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use axum_extra::extract::cookie::CookieJar;

use crate::routes::auth::claims::{Claims, TokenUse};
use crate::state::AppState;
use crate::utils::jwt::decode_jwt;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, PartialEq)]
pub struct AuthSession(pub Claims);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(AUTH_COOKIE).ok_or(StatusCode::UNAUTHORIZED)?;

        let data = decode_jwt(
            token.value(),
            &state.jwt_keys,
            &state.config.jwt_issuer,
            &state.config.jwt_audience,
        )
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

        if data.claims.token_use != TokenUse::Access {
            return Err(StatusCode::UNAUTHORIZED);
        }

        Ok(AuthSession(data.claims))
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::FromRequestParts;
    use axum::http::{header, Method, Request, StatusCode};
    use axum_extra::extract::cookie::Cookie;
    use std::time::{SystemTime, UNIX_EPOCH};
    use uuid::Uuid;

    use crate::models::account::AccountRole;
    use crate::routes::auth::claims::{Claims, TokenUse};
    use crate::session::AuthSession;
    use crate::state::test_support::test_state;
    use crate::utils::jwt::create_jwt;

    fn make_jwt(state: &crate::state::AppState, exp_offset: i64) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let claims = Claims {
            id: Uuid::new_v4().to_string(),
            email: "rider@example.com".into(),
            exp: (now + exp_offset) as usize,
            role: Some(AccountRole::User),
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
        .expect("JWT should create successfully")
    }

    #[tokio::test]
    async fn valid_cookie_token_is_extracted() {
        let state = test_state(Default::default());
        let jwt = make_jwt(&state, 3600);
        let cookie = Cookie::new("auth_token", jwt);

        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(header::COOKIE, cookie.to_string())
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let result = AuthSession::from_request_parts(&mut parts, &state).await;
        assert!(result.is_ok());
        assert_eq!(result.unwrap().0.email, "rider@example.com");
    }

    #[tokio::test]
    async fn missing_cookie_is_unauthorized() {
        let state = test_state(Default::default());
        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let result = AuthSession::from_request_parts(&mut parts, &state).await;
        assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() {
        let state = test_state(Default::default());
        let jwt = make_jwt(&state, -3600);
        let cookie = Cookie::new("auth_token", jwt);

        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(header::COOKIE, cookie.to_string())
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let result = AuthSession::from_request_parts(&mut parts, &state).await;
        assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
    }
}
