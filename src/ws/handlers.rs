use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{
    common::{app_state::AppState, error::ServerError},
    ws::{
        client::{self, Connection, MAX_MESSAGE_SIZE},
        events::{self, GameEvent, JoinRoomData, ReconnectData, SubmitAnswerData},
        hub::{ConnectionStatus, Player},
    },
};

pub fn ws_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| client::serve_connection(state, socket))
}

/// Dispatches one inbound frame. Failures become an `error` event back to
/// this connection only.
pub async fn handle_message(state: &Arc<AppState>, conn: &mut Connection, raw: &str) {
    let event: GameEvent = match serde_json::from_str(raw) {
        Ok(event) => event,
        Err(_) => {
            conn.send(GameEvent::error("Invalid message format"));
            return;
        }
    };

    debug!(
        "Received message type: {} from player: {}",
        event.event_type, conn.player_id
    );

    let result = match event.event_type.as_str() {
        events::JOIN_ROOM => handle_join_room(state, conn, event.data).await,
        events::LEAVE_ROOM => handle_leave_room(state, conn).await,
        events::START_GAME => handle_start_game(state, conn).await,
        events::SUBMIT_ANSWER => handle_submit_answer(state, conn, event.data).await,
        events::PLAY_AGAIN => handle_play_again(state, conn, event.data).await,
        events::RECONNECT => handle_reconnect(state, conn, event.data).await,
        other => {
            warn!("Unknown event type {} from player {}", other, conn.player_id);
            conn.send(GameEvent::error("Unknown event type"));
            Ok(())
        }
    };

    if let Err(e) = result {
        warn!(
            "Failed to handle {} from player {}: {}",
            event.event_type, conn.player_id, e
        );
        conn.send(GameEvent::error(&e.to_string()));
    }
}

fn payload<T: DeserializeOwned>(data: Option<Value>) -> Result<T, ServerError> {
    let value = data.ok_or_else(|| ServerError::InvalidMessage("missing payload".into()))?;
    serde_json::from_value(value).map_err(|_| ServerError::InvalidMessage("invalid payload".into()))
}

async fn handle_join_room(
    state: &Arc<AppState>,
    conn: &mut Connection,
    data: Option<Value>,
) -> Result<(), ServerError> {
    let join: JoinRoomData = payload(data)?;

    let room = state
        .room_service()
        .join_room(&join.room_code, &conn.player_id)
        .await?;

    conn.room_code = room.code.clone();
    conn.username = join.username.clone();

    let hub = state.hub();
    hub.register(
        &room.code,
        Player::new(
            conn.player_id.clone(),
            join.username.clone(),
            conn.sender.clone(),
        ),
    )
    .await;

    let all_players = hub.all_players_in_room(&room.code).await;
    let active_players = hub.players_in_room(&room.code).await;

    hub.broadcast(
        &room.code,
        GameEvent::new(
            events::PLAYER_JOINED,
            json!({
                "player_id": conn.player_id,
                "username": join.username,
                "total_players": active_players.len(),
            }),
        ),
    )
    .await;

    hub.send_to_player(
        &room.code,
        &conn.player_id,
        GameEvent::new(
            events::ROOM_JOINED,
            json!({
                "room_code": room.code,
                "player_id": conn.player_id,
                "players": all_players,
                "active_players": active_players,
                "settings": {
                    "max_players": room.max_players,
                    "round_time": room.round_time,
                    "max_rounds": room.max_rounds,
                },
            }),
        ),
    )
    .await;

    Ok(())
}

async fn handle_leave_room(state: &Arc<AppState>, conn: &mut Connection) -> Result<(), ServerError> {
    if conn.room_code.is_empty() {
        return Err(ServerError::Validation("not in a room".into()));
    }

    let room_code = std::mem::take(&mut conn.room_code);
    let hub = state.hub();

    hub.broadcast(
        &room_code,
        GameEvent::new(
            events::PLAYER_LEFT,
            json!({ "player_id": conn.player_id, "username": conn.username }),
        ),
    )
    .await;

    hub.unregister(&room_code, &conn.player_id).await;
    Ok(())
}

async fn handle_start_game(state: &Arc<AppState>, conn: &mut Connection) -> Result<(), ServerError> {
    if conn.room_code.is_empty() {
        return Err(ServerError::Validation("not in a room".into()));
    }

    let hub = state.hub();
    let active_players = hub.active_player_count(&conn.room_code).await;
    if active_players < 2 {
        return Err(ServerError::Validation(
            "need at least 2 active players to start".into(),
        ));
    }

    state.room_service().start_game(&conn.room_code).await?;
    let started = state.game_service().start_round(&conn.room_code).await?;

    hub.broadcast(
        &conn.room_code,
        GameEvent::new(
            events::ROUND_STARTED,
            json!({
                "question": started.question,
                "round_number": started.round_number,
                "time_limit": started.time_limit,
                "active_players": active_players,
            }),
        ),
    )
    .await;

    Ok(())
}

async fn handle_submit_answer(
    state: &Arc<AppState>,
    conn: &mut Connection,
    data: Option<Value>,
) -> Result<(), ServerError> {
    if conn.room_code.is_empty() {
        return Err(ServerError::Validation("not in a room".into()));
    }

    let submission: SubmitAnswerData = payload(data)?;

    let result = state
        .game_service()
        .submit_answer(&conn.room_code, &conn.player_id, &submission.answer)
        .await?;

    state
        .hub()
        .send_to_player(
            &conn.room_code,
            &conn.player_id,
            GameEvent::new(events::ANSWER_RESULT, json!(result)),
        )
        .await;

    Ok(())
}

async fn handle_play_again(
    state: &Arc<AppState>,
    conn: &mut Connection,
    data: Option<Value>,
) -> Result<(), ServerError> {
    if conn.room_code.is_empty() {
        return Err(ServerError::Validation("not in a room".into()));
    }

    // Settings are optional; an empty payload restarts with the defaults.
    let settings = match data {
        Some(value) => serde_json::from_value(value)
            .map_err(|_| ServerError::InvalidMessage("invalid settings format".into()))?,
        None => Default::default(),
    };

    state
        .game_service()
        .restart_game(&conn.room_code, settings)
        .await
}

async fn handle_reconnect(
    state: &Arc<AppState>,
    conn: &mut Connection,
    data: Option<Value>,
) -> Result<(), ServerError> {
    let reconnect: ReconnectData = payload(data)?;

    let room = state.room_service().get_room(&reconnect.room_code).await?;
    let hub = state.hub();

    let existing = hub
        .find_player(&room.code, &reconnect.player_id)
        .await
        .ok_or_else(|| ServerError::NotFound("player not found in this room".into()))?;

    if existing.status == ConnectionStatus::Active {
        return Err(ServerError::Validation(
            "player already active in this room".into(),
        ));
    }

    // Adopt the stored identity onto this connection.
    hub.unregister(&room.code, &reconnect.player_id).await;
    conn.player_id = reconnect.player_id.clone();
    conn.username = existing.username.clone();
    conn.room_code = room.code.clone();

    hub.register(
        &room.code,
        Player::new(
            conn.player_id.clone(),
            conn.username.clone(),
            conn.sender.clone(),
        ),
    )
    .await;

    let game_state = state
        .game_service()
        .get_game_state(&room.code, &conn.player_id)
        .await?;

    hub.broadcast(
        &room.code,
        GameEvent::new(
            events::PLAYER_RECONNECTED,
            json!({ "player_id": conn.player_id, "username": conn.username }),
        ),
    )
    .await;

    hub.send_to_player(
        &room.code,
        &conn.player_id,
        GameEvent::new(events::RECONNECTED, game_state),
    )
    .await;

    Ok(())
}
