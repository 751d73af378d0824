use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::Duration,
};

use dashmap::DashMap;
use serde_json::json;
use sqlx::{Pool, Postgres};
use tracing::{error, info};

use crate::{
    common::error::ServerError,
    config::config::CONFIG,
    game::models::{AnswerResult, GameSettings, PlayerResult, RoundAnswer, RoundScore, StartedRound},
    question::{db as question_db, models::PublicQuestion},
    room::{
        db as room_db,
        models::{Room, RoomStatus},
    },
    round::{db as round_db, models::RoundState},
    ws::{
        events::{self, GameEvent},
        hub::Hub,
    },
};

/// Marker for a running countdown. Whichever path removes the entry from the
/// timer map owns round termination; the countdown task exits once its entry
/// is gone.
pub(crate) struct RoundTimer {
    pub round_number: i32,
}

/// Atomically claims the right to end the given round. Returns false when
/// another path already claimed it or a newer round owns the slot.
pub(crate) fn claim_round_end(
    timers: &DashMap<String, RoundTimer>,
    room_code: &str,
    round_number: i32,
) -> bool {
    timers
        .remove_if(room_code, |_, timer| timer.round_number == round_number)
        .is_some()
}

pub(crate) fn score_for_order(order: i32) -> i32 {
    match order {
        1 => 1000,
        2 => 750,
        3 => 500,
        _ => 250,
    }
}

pub(crate) fn clean_for_comparison(s: &str) -> String {
    let mut cleaned = String::with_capacity(s.len());
    let mut last_was_space = false;

    for c in s.to_lowercase().chars() {
        if matches!(c, ',' | '.' | ';' | ':' | '"' | '\'' | '!' | '?' | '(' | ')') {
            continue;
        }
        if c.is_whitespace() {
            if !last_was_space {
                cleaned.push(' ');
            }
            last_was_space = true;
        } else {
            cleaned.push(c);
            last_was_space = false;
        }
    }

    cleaned.trim().to_string()
}

/// Comparison cascade, first match wins: case-insensitive trimmed equality,
/// lowercase trimmed equality, then cleaned equality.
pub(crate) fn answers_match(submitted: &str, expected: &str) -> bool {
    let submitted = submitted.trim();
    let expected = expected.trim();

    if submitted.eq_ignore_ascii_case(expected) {
        return true;
    }
    if submitted.to_lowercase() == expected.to_lowercase() {
        return true;
    }
    clean_for_comparison(submitted) == clean_for_comparison(expected)
}

/// Dense ranking over results sorted by total score descending: equal totals
/// share a rank, the next distinct total ranks at its sorted position + 1.
pub(crate) fn assign_ranks(results: &mut [PlayerResult]) {
    let mut current_rank = 1;
    let mut previous_score = None;

    for (i, result) in results.iter_mut().enumerate() {
        if previous_score != Some(result.total_score) {
            current_rank = i as i32 + 1;
        }
        result.rank = current_rank;
        previous_score = Some(result.total_score);
    }
}

pub struct GameService {
    me: Weak<GameService>,
    pool: Pool<Postgres>,
    hub: Arc<Hub>,
    round_timers: DashMap<String, RoundTimer>,
}

impl GameService {
    pub fn new(pool: Pool<Postgres>, hub: Arc<Hub>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            pool,
            hub,
            round_timers: DashMap::new(),
        })
    }

    async fn get_room(&self, room_code: &str) -> Result<Room, ServerError> {
        room_db::get_room_by_code(&self.pool, room_code)
            .await?
            .ok_or_else(|| ServerError::NotFound("room not found".into()))
    }

    /// Begins the next round: picks a random question, persists the round and
    /// starts its countdown. The caller broadcasts `round_started`.
    pub async fn start_round(&self, room_code: &str) -> Result<StartedRound, ServerError> {
        let room = self.get_room(room_code).await?;

        if room.status != RoomStatus::Playing {
            return Err(ServerError::Validation("game not in progress".into()));
        }

        let question = question_db::get_random_question(&self.pool)
            .await?
            .ok_or_else(|| ServerError::Internal("question catalog is empty".into()))?;

        let round_number = room.current_round + 1;
        round_db::create_round(&self.pool, room.id, question.id, round_number, room.round_time)
            .await?;
        room_db::increment_current_round(&self.pool, room.id).await?;
        room_db::update_last_activity(&self.pool, room.id).await?;

        self.spawn_round_timer(room_code, round_number, room.round_time);

        info!("Started round {} in room {}", round_number, room_code);

        Ok(StartedRound {
            question: PublicQuestion::from(&question),
            round_number,
            time_limit: room.round_time,
        })
    }

    fn spawn_round_timer(&self, room_code: &str, round_number: i32, duration: i32) {
        let Some(service) = self.me.upgrade() else {
            return;
        };

        self.round_timers
            .insert(room_code.to_string(), RoundTimer { round_number });

        let code = room_code.to_string();
        tokio::spawn(async move {
            let mut remaining = duration;
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            tick.tick().await;

            loop {
                tick.tick().await;
                remaining -= 1;

                service
                    .hub
                    .broadcast(
                        &code,
                        GameEvent::new(
                            events::TIMER_UPDATE,
                            json!({ "remaining": remaining, "warning": remaining <= 5 }),
                        ),
                    )
                    .await;

                let still_owned = service
                    .round_timers
                    .get(&code)
                    .is_some_and(|t| t.round_number == round_number);
                if !still_owned {
                    // The submit path ended the round; that was the final update.
                    return;
                }

                if remaining <= 0 {
                    if claim_round_end(&service.round_timers, &code, round_number) {
                        service.end_round(&code).await;
                    }
                    return;
                }
            }
        });
    }

    /// Scores one submission. Correct answers receive their arrival order via
    /// the atomic counter increment, so no two of them can share an order.
    pub async fn submit_answer(
        &self,
        room_code: &str,
        player_id: &str,
        answer: &str,
    ) -> Result<AnswerResult, ServerError> {
        let room = self.get_room(room_code).await?;

        let round = round_db::get_current_round(&self.pool, room.id)
            .await?
            .ok_or_else(|| ServerError::Validation("round not active".into()))?;

        let question = question_db::get_question_by_id(&self.pool, round.question_id)
            .await?
            .ok_or_else(|| ServerError::NotFound("question not found".into()))?;

        // A second correct submission is a no-op echoing the recorded result.
        if let Some(existing) = round_db::get_correct_answer(&self.pool, round.id, player_id).await?
        {
            return Ok(AnswerResult {
                correct: true,
                score: existing.score,
                order: existing.answer_order,
            });
        }

        if !answers_match(answer, &question.answer) {
            round_db::save_answer(&self.pool, round.id, player_id, answer, 0, 0).await?;
            info!(
                "Player {} submitted incorrect answer in room {}",
                player_id, room_code
            );
            return Ok(AnswerResult {
                correct: false,
                score: 0,
                order: 0,
            });
        }

        let order = round_db::increment_answer_count(&self.pool, round.id).await?;
        let score = score_for_order(order);
        round_db::save_answer(&self.pool, round.id, player_id, answer, score, order).await?;

        info!(
            "Player {} answered correctly in room {} (order: {}, score: {})",
            player_id, room_code, order, score
        );

        // Every active player answered correctly: end the round now, unless
        // the countdown beat us to it.
        let active_players = self.hub.active_player_count(room_code).await;
        if order as usize >= active_players
            && claim_round_end(&self.round_timers, room_code, round.round_number)
        {
            if let Some(service) = self.me.upgrade() {
                let code = room_code.to_string();
                tokio::spawn(async move {
                    service.end_round(&code).await;
                });
            }
        }

        Ok(AnswerResult {
            correct: true,
            score,
            order,
        })
    }

    /// Runs exactly once per round; callers must hold the termination claim.
    pub async fn end_round(&self, room_code: &str) {
        if let Err(e) = self.finish_round(room_code).await {
            error!("Failed to finish round in room {}: {}", room_code, e);
        }
    }

    async fn finish_round(&self, room_code: &str) -> Result<(), ServerError> {
        let room = self.get_room(room_code).await?;

        let round = round_db::get_current_round(&self.pool, room.id)
            .await?
            .ok_or_else(|| ServerError::Validation("no active round".into()))?;

        round_db::update_round_state(&self.pool, round.id, RoundState::Finished).await?;

        let answers: Vec<RoundAnswer> = round_db::get_round_answers(&self.pool, round.id)
            .await?
            .iter()
            .map(RoundAnswer::from)
            .collect();
        let question = question_db::get_question_by_id(&self.pool, round.question_id)
            .await?
            .ok_or_else(|| ServerError::NotFound("question not found".into()))?;

        self.hub
            .broadcast(
                room_code,
                GameEvent::new(
                    events::ROUND_RESULT,
                    json!({
                        "round_number": round.round_number,
                        "question": question.content,
                        "correct_answer": question.answer,
                        "answers": answers,
                    }),
                ),
            )
            .await;

        info!("Round {} ended in room {}", round.round_number, room_code);

        if round.round_number >= room.max_rounds {
            return self.finish_game(room_code).await;
        }

        tokio::time::sleep(Duration::from_secs(CONFIG.game.round_gap_seconds)).await;

        let started = self.start_round(room_code).await?;
        let active_players = self.hub.active_player_count(room_code).await;
        self.hub
            .broadcast(
                room_code,
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

    /// Final ranking is recomputed from the persisted answers rather than
    /// accumulated in memory, so a mid-round persistence failure cannot skew
    /// the result.
    async fn finish_game(&self, room_code: &str) -> Result<(), ServerError> {
        let room = self.get_room(room_code).await?;

        room_db::mark_room_finished(&self.pool, room.id).await?;
        self.round_timers.remove(room_code);

        let rounds = round_db::get_room_rounds(&self.pool, room.id).await?;
        let presences = self.hub.all_players_in_room(room_code).await;

        let mut results: HashMap<String, PlayerResult> = presences
            .into_iter()
            .map(|p| {
                (
                    p.id.clone(),
                    PlayerResult::new(p.id, p.username, rounds.len()),
                )
            })
            .collect();

        for (i, round) in rounds.iter().enumerate() {
            let answers = round_db::get_round_answers(&self.pool, round.id).await?;
            for answer in answers {
                // Players who already left still rank; their id stands in for
                // the username the hub no longer knows.
                let entry = results.entry(answer.player_id.clone()).or_insert_with(|| {
                    PlayerResult::new(
                        answer.player_id.clone(),
                        answer.player_id.clone(),
                        rounds.len(),
                    )
                });
                entry.total_score += answer.score;
                entry.rounds[i] = RoundScore {
                    correct: answer.score > 0,
                    score: answer.score,
                    order: answer.answer_order,
                };
            }
        }

        let mut final_results: Vec<PlayerResult> = results.into_values().collect();
        final_results.sort_by(|a, b| b.total_score.cmp(&a.total_score));
        assign_ranks(&mut final_results);

        self.hub
            .broadcast(
                room_code,
                GameEvent::new(
                    events::GAME_END,
                    json!({
                        "final_results": final_results,
                        "total_rounds": rounds.len(),
                        "room_code": room_code,
                    }),
                ),
            )
            .await;

        info!(
            "Game ended in room {} after {} rounds",
            room_code,
            rounds.len()
        );
        Ok(())
    }

    /// `play_again`: same players, fresh scoreboard, optionally new settings.
    pub async fn restart_game(
        &self,
        room_code: &str,
        settings: GameSettings,
    ) -> Result<(), ServerError> {
        let active_players = self.hub.active_player_count(room_code).await;
        if active_players < 2 {
            return Err(ServerError::Validation(
                "need at least 2 active players to restart game".into(),
            ));
        }

        let room = self.get_room(room_code).await?;
        let (max_rounds, round_time) = settings.normalize();

        room_db::reset_room_for_restart(&self.pool, room.id, max_rounds, round_time).await?;
        self.round_timers.remove(room_code);

        self.hub
            .broadcast(
                room_code,
                GameEvent::new(
                    events::GAME_RESTART,
                    json!({
                        "settings": { "max_rounds": max_rounds, "round_time": round_time }
                    }),
                ),
            )
            .await;

        info!(
            "Game restarted in room {} with {} rounds, {} seconds per round",
            room_code, max_rounds, round_time
        );
        Ok(())
    }

    /// Snapshot for a reconnecting player: room progress, roster, the open
    /// question when one is live, and the player's own answers so far.
    pub async fn get_game_state(
        &self,
        room_code: &str,
        player_id: &str,
    ) -> Result<serde_json::Value, ServerError> {
        let room = self.get_room(room_code).await?;

        let players = self.hub.players_in_room(room_code).await;
        let answers: Vec<RoundAnswer> = round_db::get_player_answers(&self.pool, room.id, player_id)
            .await?
            .iter()
            .map(RoundAnswer::from)
            .collect();

        let mut state = json!({
            "room_code": room.code,
            "game_status": room.status,
            "current_round": room.current_round,
            "max_rounds": room.max_rounds,
            "round_time": room.round_time,
            "players": players,
            "your_answers": answers,
        });

        if room.status == RoomStatus::Playing {
            if let Some(round) = round_db::get_current_round(&self.pool, room.id).await? {
                if let Some(question) =
                    question_db::get_question_by_id(&self.pool, round.question_id).await?
                {
                    state["current_question"] = json!(PublicQuestion::from(&question));
                    state["round_end_time"] = json!(round.end_time);
                }
            }
        }

        Ok(state)
    }
}
