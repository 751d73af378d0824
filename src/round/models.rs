use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(type_name = "round_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoundState {
    Active,
    Finished,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GameRound {
    pub id: Uuid,
    pub room_id: Uuid,
    pub question_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub round_number: i32,
    pub state: RoundState,
    pub answer_count: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlayerAnswer {
    pub id: Uuid,
    pub round_id: Uuid,
    pub player_id: String,
    pub answer: String,
    pub score: i32,
    pub answer_order: i32,
    pub answered_at: DateTime<Utc>,
}
