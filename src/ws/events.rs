use serde::{Deserialize, Serialize};
use serde_json::Value;

/* Inbound event types */

pub const JOIN_ROOM: &str = "join_room";
pub const LEAVE_ROOM: &str = "leave_room";
pub const START_GAME: &str = "start_game";
pub const SUBMIT_ANSWER: &str = "submit_answer";
pub const PLAY_AGAIN: &str = "play_again";
pub const RECONNECT: &str = "reconnect";

/* Outbound event types */

pub const ROOM_JOINED: &str = "room_joined";
pub const PLAYER_JOINED: &str = "player_joined";
pub const PLAYER_LEFT: &str = "player_left";
pub const PLAYER_DISCONNECTED: &str = "player_disconnected";
pub const PLAYER_RECONNECTED: &str = "player_reconnected";
pub const ROUND_STARTED: &str = "round_started";
pub const TIMER_UPDATE: &str = "timer_update";
pub const ANSWER_RESULT: &str = "answer_result";
pub const ROUND_RESULT: &str = "round_result";
pub const GAME_END: &str = "game_end";
pub const GAME_RESTART: &str = "game_restart";
pub const RECONNECTED: &str = "reconnected";
pub const ERROR: &str = "error";

/// Envelope for every frame exchanged on a connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GameEvent {
    pub fn new(event_type: &str, data: Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            room_code: None,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            event_type: ERROR.to_string(),
            room_code: None,
            data: None,
            error: Some(message.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomData {
    pub room_code: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerData {
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct ReconnectData {
    pub room_code: String,
    pub player_id: String,
}
