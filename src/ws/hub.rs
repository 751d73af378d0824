use std::{
    collections::HashMap,
    sync::{Arc, OnceLock, Weak},
    time::Duration,
};

use serde::Serialize;
use serde_json::json;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::{
    config::config::CONFIG,
    ws::events::{self, GameEvent},
};

/// Outbound buffer capacity per player. A player that falls this far behind
/// is treated as disconnected rather than allowed to stall the room.
pub const OUTBOUND_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Active,
    Disconnected,
}

#[derive(Clone)]
pub struct Player {
    pub id: String,
    pub username: String,
    pub status: ConnectionStatus,
    sender: mpsc::Sender<GameEvent>,
}

impl Player {
    pub fn new(id: String, username: String, sender: mpsc::Sender<GameEvent>) -> Self {
        Self {
            id,
            username,
            status: ConnectionStatus::Active,
            sender,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerInfo {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerPresence {
    pub id: String,
    pub username: String,
    pub status: ConnectionStatus,
}

/// Installed after construction so the hub can report room traffic without
/// owning the room service.
pub trait RoomActivity: Send + Sync {
    fn room_active(&self, room_code: &str);
}

/// Single authority over which players are in which room. All membership
/// mutations take the write lock, so every caller observes a consistent
/// snapshot.
pub struct Hub {
    me: Weak<Hub>,
    rooms: RwLock<HashMap<String, HashMap<String, Player>>>,
    activity: OnceLock<Weak<dyn RoomActivity>>,
}

impl Hub {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            rooms: RwLock::new(HashMap::new()),
            activity: OnceLock::new(),
        })
    }

    /// The hub only borrows the collaborator; ownership stays with whoever
    /// built the two halves.
    pub fn set_activity(&self, activity: Arc<dyn RoomActivity>) {
        let _ = self.activity.set(Arc::downgrade(&activity));
    }

    fn touch(&self, room_code: &str) {
        if let Some(activity) = self.activity.get().and_then(Weak::upgrade) {
            activity.room_active(room_code);
        }
    }

    pub async fn register(&self, room_code: &str, player: Player) {
        let player_id = player.id.clone();
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_code.to_string())
            .or_default()
            .insert(player_id.clone(), player);
        drop(rooms);

        info!("Player {} joined room {}", player_id, room_code);
    }

    pub async fn unregister(&self, room_code: &str, player_id: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(room_code) {
            // Dropping the record closes its outbound buffer.
            if room.remove(player_id).is_some() {
                info!("Player {} left room {}", player_id, room_code);
            }
            if room.is_empty() {
                rooms.remove(room_code);
                debug!("Room {} is empty, removed from hub", room_code);
            }
        }
    }

    /// Soft removal: the player keeps its identity for the disconnect grace
    /// period and is only dropped if nobody reclaims it. The sender must
    /// match the stored record, so a stale connection whose identity was
    /// already adopted by a reconnect cannot knock the new connection out.
    pub async fn disconnect(
        &self,
        room_code: &str,
        player_id: &str,
        sender: &mpsc::Sender<GameEvent>,
    ) {
        let username = {
            let mut rooms = self.rooms.write().await;
            let Some(player) = rooms
                .get_mut(room_code)
                .and_then(|room| room.get_mut(player_id))
            else {
                return;
            };
            if player.status == ConnectionStatus::Disconnected
                || !player.sender.same_channel(sender)
            {
                return;
            }
            player.status = ConnectionStatus::Disconnected;
            player.username.clone()
        };

        info!("Player {} disconnected from room {}", player_id, room_code);

        self.broadcast(
            room_code,
            GameEvent::new(
                events::PLAYER_DISCONNECTED,
                json!({ "player_id": player_id, "username": username }),
            ),
        )
        .await;

        self.schedule_cleanup(room_code, player_id);
    }

    /// Removes the player after the grace period unless it reconnected.
    fn schedule_cleanup(&self, room_code: &str, player_id: &str) {
        let Some(hub) = self.me.upgrade() else {
            return;
        };
        let room_code = room_code.to_string();
        let player_id = player_id.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(CONFIG.game.disconnect_grace_seconds)).await;

            let mut rooms = hub.rooms.write().await;
            let Some(room) = rooms.get_mut(&room_code) else {
                return;
            };
            let still_gone = room
                .get(&player_id)
                .is_some_and(|p| p.status == ConnectionStatus::Disconnected);
            if still_gone {
                room.remove(&player_id);
                info!(
                    "Removed player {} from room {} after disconnect grace",
                    player_id, room_code
                );
                if room.is_empty() {
                    rooms.remove(&room_code);
                }
            }
        });
    }

    /// Delivers the event to every active player in the room. A full buffer
    /// marks that player disconnected; the remaining recipients are never
    /// held up. Holding the write lock keeps per-recipient delivery order
    /// identical across the room.
    pub async fn broadcast(&self, room_code: &str, mut event: GameEvent) {
        event.room_code = Some(room_code.to_string());

        let mut dropped: Vec<(String, String)> = Vec::new();
        {
            let mut rooms = self.rooms.write().await;
            let Some(room) = rooms.get_mut(room_code) else {
                return;
            };
            for player in room.values_mut() {
                if player.status != ConnectionStatus::Active {
                    continue;
                }
                if player.sender.try_send(event.clone()).is_err() {
                    warn!(
                        "Send buffer full for player {} in room {}, dropping connection",
                        player.id, room_code
                    );
                    player.status = ConnectionStatus::Disconnected;
                    dropped.push((player.id.clone(), player.username.clone()));
                }
            }
        }

        self.touch(room_code);

        for (player_id, username) in dropped {
            self.announce_disconnected(room_code, &player_id, &username);
            self.schedule_cleanup(room_code, &player_id);
        }
    }

    /// Delivers to a single player; the backpressure policy matches
    /// `broadcast`.
    pub async fn send_to_player(&self, room_code: &str, player_id: &str, mut event: GameEvent) -> bool {
        event.room_code = Some(room_code.to_string());

        let dropped = {
            let mut rooms = self.rooms.write().await;
            let Some(player) = rooms
                .get_mut(room_code)
                .and_then(|room| room.get_mut(player_id))
            else {
                return false;
            };
            if player.status != ConnectionStatus::Active {
                return false;
            }
            if player.sender.try_send(event).is_err() {
                player.status = ConnectionStatus::Disconnected;
                Some(player.username.clone())
            } else {
                None
            }
        };

        match dropped {
            None => true,
            Some(username) => {
                warn!(
                    "Send buffer full for player {} in room {}, dropping connection",
                    player_id, room_code
                );
                self.announce_disconnected(room_code, player_id, &username);
                self.schedule_cleanup(room_code, player_id);
                false
            }
        }
    }

    fn announce_disconnected(&self, room_code: &str, player_id: &str, username: &str) {
        let Some(hub) = self.me.upgrade() else {
            return;
        };
        let room_code = room_code.to_string();
        let payload = json!({ "player_id": player_id, "username": username });

        tokio::spawn(async move {
            hub.broadcast(
                &room_code,
                GameEvent::new(events::PLAYER_DISCONNECTED, payload),
            )
            .await;
        });
    }

    pub async fn player_count(&self, room_code: &str) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(room_code).map_or(0, |room| room.len())
    }

    pub async fn active_player_count(&self, room_code: &str) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(room_code).map_or(0, |room| {
            room.values()
                .filter(|p| p.status == ConnectionStatus::Active)
                .count()
        })
    }

    pub async fn players_in_room(&self, room_code: &str) -> Vec<PlayerInfo> {
        let rooms = self.rooms.read().await;
        rooms.get(room_code).map_or_else(Vec::new, |room| {
            room.values()
                .filter(|p| p.status == ConnectionStatus::Active)
                .map(|p| PlayerInfo {
                    id: p.id.clone(),
                    username: p.username.clone(),
                })
                .collect()
        })
    }

    pub async fn all_players_in_room(&self, room_code: &str) -> Vec<PlayerPresence> {
        let rooms = self.rooms.read().await;
        rooms.get(room_code).map_or_else(Vec::new, |room| {
            room.values()
                .map(|p| PlayerPresence {
                    id: p.id.clone(),
                    username: p.username.clone(),
                    status: p.status,
                })
                .collect()
        })
    }

    pub async fn find_player(&self, room_code: &str, player_id: &str) -> Option<PlayerPresence> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room_code)
            .and_then(|room| room.get(player_id))
            .map(|p| PlayerPresence {
                id: p.id.clone(),
                username: p.username.clone(),
                status: p.status,
            })
    }
}
