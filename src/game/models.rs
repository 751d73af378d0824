use serde::{Deserialize, Serialize};

use crate::{
    config::config::CONFIG, question::models::PublicQuestion, round::models::PlayerAnswer,
};

/// Outcome of one answer submission, echoed back to the submitter.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AnswerResult {
    pub correct: bool,
    pub score: i32,
    pub order: i32,
}

/// Answer as it appears in `round_result` and reconnect payloads; the stored
/// row's ids and timestamps stay server-side.
#[derive(Debug, Clone, Serialize)]
pub struct RoundAnswer {
    pub player_id: String,
    pub answer_text: String,
    pub score: i32,
    pub order: i32,
}

impl From<&PlayerAnswer> for RoundAnswer {
    fn from(answer: &PlayerAnswer) -> Self {
        Self {
            player_id: answer.player_id.clone(),
            answer_text: answer.answer.clone(),
            score: answer.score,
            order: answer.answer_order,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RoundScore {
    pub correct: bool,
    pub score: i32,
    pub order: i32,
}

impl RoundScore {
    pub fn missed() -> Self {
        Self {
            correct: false,
            score: 0,
            order: 0,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlayerResult {
    pub player_id: String,
    pub username: String,
    pub total_score: i32,
    pub rank: i32,
    pub rounds: Vec<RoundScore>,
}

impl PlayerResult {
    pub fn new(player_id: String, username: String, total_rounds: usize) -> Self {
        Self {
            player_id,
            username,
            total_score: 0,
            rank: 0,
            rounds: vec![RoundScore::missed(); total_rounds],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GameSettings {
    pub max_rounds: Option<i32>,
    pub round_time: Option<i32>,
}

impl GameSettings {
    /// Missing or non-positive values fall back to the configured defaults.
    pub fn normalize(&self) -> (i32, i32) {
        let max_rounds = match self.max_rounds {
            Some(n) if n > 0 => n,
            _ => CONFIG.game.max_rounds,
        };
        let round_time = match self.round_time {
            Some(n) if n > 0 => n,
            _ => CONFIG.game.round_time,
        };
        (max_rounds, round_time)
    }
}

/// What `start_round` hands back for the `round_started` broadcast.
#[derive(Debug, Serialize)]
pub struct StartedRound {
    pub question: PublicQuestion,
    pub round_number: i32,
    pub time_limit: i32,
}
