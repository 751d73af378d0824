use std::{sync::Arc, time::Duration};

use chrono::Utc;
use sqlx::{Pool, Postgres};
use tracing::{error, info, warn};

use crate::{
    common::error::ServerError,
    config::config::CONFIG,
    game::service::GameService,
    room::{db as room_db, models::RoomStatus, service::RoomService},
    ws::hub::Hub,
};

pub struct AppState {
    pool: Pool<Postgres>,
    hub: Arc<Hub>,
    room_service: Arc<RoomService>,
    game_service: Arc<GameService>,
}

impl AppState {
    pub async fn from_connection_string(connection_string: &str) -> Result<Arc<Self>, ServerError> {
        let pool = Pool::<Postgres>::connect(connection_string).await?;

        let hub = Hub::new();
        let room_service = Arc::new(RoomService::new(pool.clone(), Arc::clone(&hub)));
        let game_service = GameService::new(pool.clone(), Arc::clone(&hub));

        // Break the hub/room-service cycle: the hub reports traffic through
        // this collaborator instead of owning the service.
        hub.set_activity(room_service.clone());

        let state = Arc::new(Self {
            pool,
            hub,
            room_service,
            game_service,
        });

        Ok(state)
    }

    pub fn get_pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub fn room_service(&self) -> &Arc<RoomService> {
        &self.room_service
    }

    pub fn game_service(&self) -> &Arc<GameService> {
        &self.game_service
    }

    /// Periodic sweep over rooms nobody has touched lately: empty waiting
    /// rooms are deleted, empty in-progress rooms are marked abandoned.
    pub fn spawn_room_cleanup(self: &Arc<Self>) {
        let state = Arc::clone(self);
        let mut interval =
            tokio::time::interval(Duration::from_secs(CONFIG.game.cleanup_interval_seconds));

        tokio::spawn(async move {
            loop {
                interval.tick().await;
                if let Err(e) = state.cleanup_idle_rooms().await {
                    error!("Failed to clean up idle rooms: {}", e);
                }
            }
        });

        info!("Room cleanup routine started");
    }

    async fn cleanup_idle_rooms(&self) -> Result<(), ServerError> {
        let cutoff =
            Utc::now() - chrono::Duration::seconds(CONFIG.game.idle_room_timeout_seconds);
        let rooms = room_db::get_inactive_rooms(&self.pool, cutoff).await?;

        for room in rooms {
            let player_count = self.hub.player_count(&room.code).await;
            if player_count > 0 {
                continue;
            }

            match room.status {
                RoomStatus::Waiting => {
                    if let Err(e) = room_db::delete_room(&self.pool, room.id).await {
                        warn!("Failed to delete inactive room {}: {}", room.code, e);
                        continue;
                    }
                    info!("Deleted inactive waiting room: {}", room.code);
                }
                RoomStatus::Playing => {
                    if let Err(e) =
                        room_db::update_room_status(&self.pool, room.id, RoomStatus::Abandoned)
                            .await
                    {
                        warn!("Failed to mark room {} as abandoned: {}", room.code, e);
                        continue;
                    }
                    info!("Marked empty game room as abandoned: {}", room.code);
                }
                _ => {}
            }
        }

        Ok(())
    }
}
