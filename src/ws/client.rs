use std::{sync::Arc, time::Duration};

use axum::extract::ws::{Message, WebSocket};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    common::app_state::AppState,
    ws::{
        events::GameEvent,
        handlers,
        hub::OUTBOUND_BUFFER,
    },
};

/// Time allowed to write a message to the peer.
const WRITE_WAIT: Duration = Duration::from_secs(10);

/// Time allowed between frames from the peer before the connection is
/// considered dead.
const PONG_WAIT: Duration = Duration::from_secs(60);

/// Ping cadence, kept under the pong deadline.
const PING_PERIOD: Duration = Duration::from_secs(54);

/// Maximum inbound frame size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 512;

/// Per-connection state the message router reads and updates.
pub struct Connection {
    pub player_id: String,
    pub username: String,
    pub room_code: String,
    pub sender: mpsc::Sender<GameEvent>,
}

impl Connection {
    /// Direct reply on this connection, bypassing room membership. Used for
    /// errors and pre-join replies.
    pub fn send(&self, event: GameEvent) {
        if self.sender.try_send(event).is_err() {
            warn!("Dropping reply to player {}: buffer full", self.player_id);
        }
    }
}

pub async fn serve_connection(state: Arc<AppState>, socket: WebSocket) {
    let (sink, stream) = socket.split();
    let (tx, rx) = mpsc::channel::<GameEvent>(OUTBOUND_BUFFER);

    let mut conn = Connection {
        player_id: Uuid::new_v4().to_string(),
        username: String::new(),
        room_code: String::new(),
        sender: tx,
    };

    info!("New WebSocket connection established: Player {}", conn.player_id);

    let writer = tokio::spawn(write_pump(sink, rx));

    read_pump(&state, &mut conn, stream).await;

    // Transport gone: keep the player's identity for the grace period.
    if !conn.room_code.is_empty() {
        state
            .hub()
            .disconnect(&conn.room_code, &conn.player_id, &conn.sender)
            .await;
    }

    writer.abort();
    info!("Player {} connection closed", conn.player_id);
}

async fn read_pump(state: &Arc<AppState>, conn: &mut Connection, mut stream: SplitStream<WebSocket>) {
    loop {
        let frame = match tokio::time::timeout(PONG_WAIT, stream.next()).await {
            Err(_) => {
                warn!("Keepalive expired for player {}", conn.player_id);
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!("Read error for player {}: {}", conn.player_id, e);
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => {
                handlers::handle_message(state, conn, text.as_str()).await;
            }
            Message::Close(_) => break,
            // Pings and pongs only feed the read deadline.
            _ => {}
        }
    }
}

async fn write_pump(mut sink: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<GameEvent>) {
    let mut ping = tokio::time::interval(PING_PERIOD);
    ping.tick().await;

    loop {
        tokio::select! {
            maybe_event = rx.recv() => {
                let Some(event) = maybe_event else {
                    // The hub dropped this player; say goodbye.
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to serialize outbound event: {}", e);
                        continue;
                    }
                };
                match tokio::time::timeout(WRITE_WAIT, sink.send(Message::Text(text.into()))).await {
                    Ok(Ok(())) => {}
                    _ => return,
                }
            }
            _ = ping.tick() => {
                match tokio::time::timeout(WRITE_WAIT, sink.send(Message::Ping(Vec::new().into()))).await {
                    Ok(Ok(())) => {}
                    _ => return,
                }
            }
        }
    }
}
