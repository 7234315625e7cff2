use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::responses::JsonResponse;
use crate::routes::auth::expired_session_cookie;

pub async fn logout(jar: CookieJar) -> Response {
    (
        jar.remove(expired_session_cookie()),
        JsonResponse::success("Logged out"),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    #[tokio::test]
    async fn logout_clears_the_session_cookie() {
        let app = Router::new().route("/api/auth/logout", post(logout));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/logout")
                    .header(header::COOKIE, "auth_token=whatever")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(cookie.starts_with("auth_token="));
        assert!(cookie.contains("Max-Age=0"));
    }
}
