use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;
use uuid::Uuid;

use crate::models::horse::NewHorse;
use crate::responses::JsonResponse;
use crate::session::AuthSession;
use crate::state::AppState;

// Representative gated resource; the subscription gate wraps these routes.

pub async fn list_horses(State(state): State<AppState>, session: AuthSession) -> Response {
    let Ok(owner_id) = Uuid::parse_str(&session.0.id) else {
        return JsonResponse::unauthorized("Invalid session").into_response();
    };

    match state.horses.list_horses_for_owner(owner_id).await {
        Ok(horses) => Json(horses).into_response(),
        Err(err) => {
            error!(error = %err, "horse listing failed");
            JsonResponse::server_error("Horse listing failed").into_response()
        }
    }
}

pub async fn create_horse(
    State(state): State<AppState>,
    session: AuthSession,
    Json(payload): Json<NewHorse>,
) -> Response {
    let Ok(owner_id) = Uuid::parse_str(&session.0.id) else {
        return JsonResponse::unauthorized("Invalid session").into_response();
    };
    if payload.name.trim().is_empty() {
        return JsonResponse::bad_request("Horse name is required").into_response();
    }

    match state.horses.create_horse(owner_id, &payload).await {
        Ok(horse) => (StatusCode::CREATED, Json(horse)).into_response(),
        Err(err) => {
            error!(error = %err, "horse creation failed");
            JsonResponse::server_error("Horse creation failed").into_response()
        }
    }
}
