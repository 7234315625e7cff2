use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: String,
    pub success: bool,
    pub message: String,
    pub code: Option<String>,
}

impl JsonResponse {
    fn body(msg: &str, success: bool, code: Option<&str>) -> JsonResponse {
        JsonResponse {
            status: if success { "success" } else { "error" }.to_string(),
            success,
            message: msg.to_string(),
            code: code.map(|c| c.to_string()),
        }
    }

    pub fn success(msg: &str) -> impl IntoResponse {
        (StatusCode::OK, Json(Self::body(msg, true, None)))
    }

    pub fn not_found(msg: &str) -> impl IntoResponse {
        (StatusCode::NOT_FOUND, Json(Self::body(msg, false, None)))
    }

    pub fn conflict(msg: &str) -> impl IntoResponse {
        (StatusCode::CONFLICT, Json(Self::body(msg, false, None)))
    }

    pub fn server_error(msg: &str) -> impl IntoResponse {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self::body(msg, false, None)),
        )
    }

    pub fn service_unavailable(msg: &str) -> impl IntoResponse {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(Self::body(msg, false, None)),
        )
    }

    pub fn unauthorized(msg: &str) -> impl IntoResponse {
        (StatusCode::UNAUTHORIZED, Json(Self::body(msg, false, None)))
    }

    pub fn bad_request(msg: &str) -> impl IntoResponse {
        (StatusCode::BAD_REQUEST, Json(Self::body(msg, false, None)))
    }

    pub fn too_many_requests(msg: &str) -> impl IntoResponse {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(Self::body(msg, false, None)),
        )
    }

    pub fn forbidden_with_code(msg: &str, code: &str) -> impl IntoResponse {
        (
            StatusCode::FORBIDDEN,
            Json(Self::body(msg, false, Some(code))),
        )
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;
    use serde_json::from_slice;

    use crate::responses::JsonResponse;

    #[tokio::test]
    async fn test_success_response() {
        let resp = JsonResponse::success("ok").into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: JsonResponse = from_slice(&body).unwrap();
        assert_eq!(json.status, "success");
        assert!(json.success);
        assert_eq!(json.message, "ok");
    }

    #[tokio::test]
    async fn test_forbidden_with_code_carries_code() {
        let resp = JsonResponse::forbidden_with_code("nope", "trial_expired").into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::FORBIDDEN);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: JsonResponse = from_slice(&body).unwrap();
        assert_eq!(json.status, "error");
        assert!(!json.success);
        assert_eq!(json.code.as_deref(), Some("trial_expired"));
    }
}
