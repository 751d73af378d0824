use std::sync::Arc;

use rand::Rng;
use sqlx::{Pool, Postgres};
use tracing::{debug, info, warn};

use crate::{
    common::error::ServerError,
    config::config::CONFIG,
    room::{
        db,
        models::{Room, RoomStatus},
    },
    ws::hub::{Hub, RoomActivity},
};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;
const CODE_ATTEMPTS: usize = 5;

/// Readable room code: no I, O, 0 or 1.
pub(crate) fn generate_room_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub struct RoomService {
    pool: Pool<Postgres>,
    hub: Arc<Hub>,
}

impl RoomService {
    pub fn new(pool: Pool<Postgres>, hub: Arc<Hub>) -> Self {
        Self { pool, hub }
    }

    pub async fn create_room(&self) -> Result<Room, ServerError> {
        for _ in 0..CODE_ATTEMPTS {
            let code = generate_room_code();
            if db::get_room_by_code(&self.pool, &code).await?.is_some() {
                debug!("Room code {} already taken, retrying", code);
                continue;
            }

            let room = db::create_room(
                &self.pool,
                &code,
                CONFIG.game.max_players,
                CONFIG.game.round_time,
                CONFIG.game.max_rounds,
            )
            .await?;

            info!("Created room with code: {}", room.code);
            return Ok(room);
        }

        Err(ServerError::Internal(
            "failed to generate a unique room code".into(),
        ))
    }

    pub async fn get_room(&self, code: &str) -> Result<Room, ServerError> {
        db::get_room_by_code(&self.pool, code)
            .await?
            .ok_or_else(|| ServerError::NotFound("room not found".into()))
    }

    /// Checks that the room can take another player. Returns the room and the
    /// current active player count.
    pub async fn validate_room(&self, code: &str) -> Result<(Room, usize), ServerError> {
        let room = self.get_room(code).await?;

        if room.status != RoomStatus::Waiting {
            return Err(ServerError::Validation("game already in progress".into()));
        }

        let active_players = self.hub.active_player_count(&room.code).await;
        if active_players >= room.max_players as usize {
            return Err(ServerError::Capacity("room is full".into()));
        }

        Ok((room, active_players))
    }

    /// Approves a join. Registering the player with the hub is the caller's
    /// responsibility once this succeeds.
    pub async fn join_room(&self, code: &str, player_id: &str) -> Result<Room, ServerError> {
        let (room, _) = self.validate_room(code).await?;

        if let Err(e) = db::update_last_activity(&self.pool, room.id).await {
            warn!("Failed to update activity for room {}: {}", room.code, e);
        }

        info!("Player {} joined room {}", player_id, room.code);
        Ok(room)
    }

    pub async fn start_game(&self, code: &str) -> Result<(), ServerError> {
        let room = self.get_room(code).await?;

        if room.status != RoomStatus::Waiting {
            return Err(ServerError::Validation("game already started".into()));
        }

        let active_players = self.hub.active_player_count(&room.code).await;
        if active_players < 2 {
            return Err(ServerError::Validation(
                "need at least 2 active players to start".into(),
            ));
        }

        db::update_room_status(&self.pool, room.id, RoomStatus::Playing)
            .await?;

        info!(
            "Started game in room {} with {} active players",
            room.code, active_players
        );
        Ok(())
    }

    #[allow(dead_code)]
    pub async fn end_game(&self, code: &str) -> Result<(), ServerError> {
        let room = self.get_room(code).await?;
        db::mark_room_finished(&self.pool, room.id).await?;
        info!("Ended game in room {}", room.code);
        Ok(())
    }

    pub async fn get_active_rooms(&self) -> Result<Vec<Room>, ServerError> {
        db::get_active_rooms(&self.pool).await
    }

    #[allow(dead_code)]
    pub async fn get_player_count(&self, code: &str) -> usize {
        self.hub.active_player_count(code).await
    }
}

impl RoomActivity for RoomService {
    fn room_active(&self, room_code: &str) {
        let pool = self.pool.clone();
        let code = room_code.to_string();
        tokio::spawn(async move {
            if let Err(e) = db::touch_activity_by_code(&pool, &code).await {
                debug!("Failed to update activity for room {}: {}", code, e);
            }
        });
    }
}
