use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use tracing::warn;
use uuid::Uuid;

use crate::{
    common::error::ServerError,
    room::models::{Room, RoomStatus},
};

pub async fn create_room(
    pool: &Pool<Postgres>,
    code: &str,
    max_players: i32,
    round_time: i32,
    max_rounds: i32,
) -> Result<Room, ServerError> {
    let room = sqlx::query_as::<_, Room>(
        r#"
        INSERT INTO "rooms" (code, status, max_players, round_time, max_rounds)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(code)
    .bind(RoomStatus::Waiting)
    .bind(max_players)
    .bind(round_time)
    .bind(max_rounds)
    .fetch_one(pool)
    .await?;

    Ok(room)
}

pub async fn get_room_by_code(
    pool: &Pool<Postgres>,
    code: &str,
) -> Result<Option<Room>, ServerError> {
    let room = sqlx::query_as::<_, Room>(
        r#"
        SELECT *
        FROM "rooms"
        WHERE code = $1 AND status <> 'finished'
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(room)
}

pub async fn get_active_rooms(pool: &Pool<Postgres>) -> Result<Vec<Room>, ServerError> {
    let rooms = sqlx::query_as::<_, Room>(
        r#"
        SELECT *
        FROM "rooms"
        WHERE status IN ('waiting', 'playing')
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rooms)
}

pub async fn update_room_status(
    pool: &Pool<Postgres>,
    room_id: Uuid,
    status: RoomStatus,
) -> Result<(), ServerError> {
    let row = sqlx::query(
        r#"
        UPDATE "rooms"
        SET status = $1, last_activity = $2
        WHERE id = $3
        "#,
    )
    .bind(status)
    .bind(Utc::now())
    .bind(room_id)
    .execute(pool)
    .await?;

    if row.rows_affected() == 0 {
        warn!("Query failed, no room with id: {}", room_id);
        return Err(ServerError::NotFound("room not found".into()));
    }

    Ok(())
}

pub async fn update_last_activity(pool: &Pool<Postgres>, room_id: Uuid) -> Result<(), ServerError> {
    sqlx::query(
        r#"
        UPDATE "rooms"
        SET last_activity = $1
        WHERE id = $2
        "#,
    )
    .bind(Utc::now())
    .bind(room_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn touch_activity_by_code(
    pool: &Pool<Postgres>,
    code: &str,
) -> Result<(), ServerError> {
    sqlx::query(
        r#"
        UPDATE "rooms"
        SET last_activity = $1
        WHERE code = $2 AND status <> 'finished'
        "#,
    )
    .bind(Utc::now())
    .bind(code)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn increment_current_round(
    pool: &Pool<Postgres>,
    room_id: Uuid,
) -> Result<(), ServerError> {
    let row = sqlx::query(
        r#"
        UPDATE "rooms"
        SET current_round = current_round + 1
        WHERE id = $1
        "#,
    )
    .bind(room_id)
    .execute(pool)
    .await?;

    if row.rows_affected() == 0 {
        return Err(ServerError::NotFound("room not found".into()));
    }

    Ok(())
}

pub async fn mark_room_finished(pool: &Pool<Postgres>, room_id: Uuid) -> Result<(), ServerError> {
    let row = sqlx::query(
        r#"
        UPDATE "rooms"
        SET status = $1, ended_at = $2, last_activity = $2
        WHERE id = $3
        "#,
    )
    .bind(RoomStatus::Finished)
    .bind(Utc::now())
    .bind(room_id)
    .execute(pool)
    .await?;

    if row.rows_affected() == 0 {
        return Err(ServerError::NotFound("room not found".into()));
    }

    Ok(())
}

pub async fn reset_room_for_restart(
    pool: &Pool<Postgres>,
    room_id: Uuid,
    max_rounds: i32,
    round_time: i32,
) -> Result<(), ServerError> {
    let row = sqlx::query(
        r#"
        UPDATE "rooms"
        SET status = $1, current_round = 0, max_rounds = $2, round_time = $3,
            ended_at = NULL, last_activity = $4
        WHERE id = $5
        "#,
    )
    .bind(RoomStatus::Waiting)
    .bind(max_rounds)
    .bind(round_time)
    .bind(Utc::now())
    .bind(room_id)
    .execute(pool)
    .await?;

    if row.rows_affected() == 0 {
        return Err(ServerError::NotFound("room not found".into()));
    }

    Ok(())
}

pub async fn get_inactive_rooms(
    pool: &Pool<Postgres>,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Room>, ServerError> {
    let rooms = sqlx::query_as::<_, Room>(
        r#"
        SELECT *
        FROM "rooms"
        WHERE last_activity < $1 AND status IN ('waiting', 'playing')
        "#,
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(rooms)
}

pub async fn delete_room(pool: &Pool<Postgres>, room_id: Uuid) -> Result<(), ServerError> {
    // Rounds and answers below the room go with it (ON DELETE CASCADE).
    sqlx::query(
        r#"
        DELETE FROM "rooms"
        WHERE id = $1
        "#,
    )
    .bind(room_id)
    .execute(pool)
    .await?;

    Ok(())
}
