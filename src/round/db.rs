use chrono::{Duration, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::ServerError,
    round::models::{GameRound, PlayerAnswer, RoundState},
};

pub async fn create_round(
    pool: &Pool<Postgres>,
    room_id: Uuid,
    question_id: Uuid,
    round_number: i32,
    round_time: i32,
) -> Result<GameRound, ServerError> {
    let now = Utc::now();
    let round = sqlx::query_as::<_, GameRound>(
        r#"
        INSERT INTO "game_rounds" (room_id, question_id, start_time, end_time, round_number, state)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(room_id)
    .bind(question_id)
    .bind(now)
    .bind(now + Duration::seconds(round_time as i64))
    .bind(round_number)
    .bind(RoundState::Active)
    .fetch_one(pool)
    .await?;

    Ok(round)
}

pub async fn get_current_round(
    pool: &Pool<Postgres>,
    room_id: Uuid,
) -> Result<Option<GameRound>, ServerError> {
    let round = sqlx::query_as::<_, GameRound>(
        r#"
        SELECT *
        FROM "game_rounds"
        WHERE room_id = $1 AND state = 'active'
        ORDER BY round_number DESC
        LIMIT 1
        "#,
    )
    .bind(room_id)
    .fetch_optional(pool)
    .await?;

    Ok(round)
}

/// Increments the round's correct-answer counter and returns the new count,
/// which is the submission's answer order. The increment only succeeds while
/// the round is still active, so a late submission cannot claim an order.
pub async fn increment_answer_count(
    pool: &Pool<Postgres>,
    round_id: Uuid,
) -> Result<i32, ServerError> {
    let count = sqlx::query_scalar::<_, i32>(
        r#"
        UPDATE "game_rounds"
        SET answer_count = answer_count + 1
        WHERE id = $1 AND state = 'active'
        RETURNING answer_count
        "#,
    )
    .bind(round_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ServerError::Validation("round not active".into()))?;

    Ok(count)
}

pub async fn update_round_state(
    pool: &Pool<Postgres>,
    round_id: Uuid,
    state: RoundState,
) -> Result<(), ServerError> {
    let row = sqlx::query(
        r#"
        UPDATE "game_rounds"
        SET state = $1
        WHERE id = $2
        "#,
    )
    .bind(state)
    .bind(round_id)
    .execute(pool)
    .await?;

    if row.rows_affected() == 0 {
        return Err(ServerError::NotFound("round not found".into()));
    }

    Ok(())
}

pub async fn save_answer(
    pool: &Pool<Postgres>,
    round_id: Uuid,
    player_id: &str,
    answer: &str,
    score: i32,
    answer_order: i32,
) -> Result<(), ServerError> {
    sqlx::query(
        r#"
        INSERT INTO "player_answers" (id, round_id, player_id, answer, score, answer_order, answered_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(round_id)
    .bind(player_id)
    .bind(answer)
    .bind(score)
    .bind(answer_order)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_round_answers(
    pool: &Pool<Postgres>,
    round_id: Uuid,
) -> Result<Vec<PlayerAnswer>, ServerError> {
    let answers = sqlx::query_as::<_, PlayerAnswer>(
        r#"
        SELECT *
        FROM "player_answers"
        WHERE round_id = $1
        ORDER BY answer_order ASC, answered_at ASC
        "#,
    )
    .bind(round_id)
    .fetch_all(pool)
    .await?;

    Ok(answers)
}

pub async fn get_correct_answer(
    pool: &Pool<Postgres>,
    round_id: Uuid,
    player_id: &str,
) -> Result<Option<PlayerAnswer>, ServerError> {
    let answer = sqlx::query_as::<_, PlayerAnswer>(
        r#"
        SELECT *
        FROM "player_answers"
        WHERE round_id = $1 AND player_id = $2 AND answer_order > 0
        LIMIT 1
        "#,
    )
    .bind(round_id)
    .bind(player_id)
    .fetch_optional(pool)
    .await?;

    Ok(answer)
}

pub async fn get_room_rounds(
    pool: &Pool<Postgres>,
    room_id: Uuid,
) -> Result<Vec<GameRound>, ServerError> {
    let rounds = sqlx::query_as::<_, GameRound>(
        r#"
        SELECT *
        FROM "game_rounds"
        WHERE room_id = $1
        ORDER BY round_number ASC
        "#,
    )
    .bind(room_id)
    .fetch_all(pool)
    .await?;

    Ok(rounds)
}

pub async fn get_player_answers(
    pool: &Pool<Postgres>,
    room_id: Uuid,
    player_id: &str,
) -> Result<Vec<PlayerAnswer>, ServerError> {
    let answers = sqlx::query_as::<_, PlayerAnswer>(
        r#"
        SELECT pa.*
        FROM "player_answers" pa
        JOIN "game_rounds" gr ON pa.round_id = gr.id
        WHERE gr.room_id = $1 AND pa.player_id = $2
        ORDER BY gr.round_number ASC, pa.answered_at ASC
        "#,
    )
    .bind(room_id)
    .bind(player_id)
    .fetch_all(pool)
    .await?;

    Ok(answers)
}
