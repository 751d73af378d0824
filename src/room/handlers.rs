use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde_json::json;
use tracing::debug;

use crate::{
    common::{app_state::AppState, error::ServerError},
    room::models::ValidateRoomRequest,
};

pub fn room_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/rooms", post(create_room).get(get_active_rooms))
        .route("/rooms/validate", post(validate_room))
        .with_state(state)
}

async fn create_room(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServerError> {
    let room = state.room_service().create_room().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "code": room.code,
            "max_players": room.max_players,
            "round_time": room.round_time,
        })),
    ))
}

async fn get_active_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServerError> {
    let rooms = state.room_service().get_active_rooms().await?;
    Ok((StatusCode::OK, Json(rooms)))
}

async fn validate_room(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ValidateRoomRequest>,
) -> Result<impl IntoResponse, ServerError> {
    debug!(
        "Validating room {} for username {}",
        request.room_code, request.username
    );

    match state.room_service().validate_room(&request.room_code).await {
        Ok((room, player_count)) => Ok((
            StatusCode::OK,
            Json(json!({
                "room_code": room.code,
                "max_players": room.max_players,
                "round_time": room.round_time,
                "max_rounds": room.max_rounds,
                "player_count": player_count,
            })),
        )
            .into_response()),
        Err(
            e @ (ServerError::NotFound(_) | ServerError::Validation(_) | ServerError::Capacity(_)),
        ) => Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}
