#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::mpsc;

    use crate::ws::{
        events::{self, GameEvent},
        hub::{ConnectionStatus, Hub, Player},
    };

    struct TestPlayer {
        player: Player,
        tx: mpsc::Sender<GameEvent>,
        rx: mpsc::Receiver<GameEvent>,
    }

    fn player(id: &str, username: &str, buffer: usize) -> TestPlayer {
        let (tx, rx) = mpsc::channel(buffer);
        TestPlayer {
            player: Player::new(id.into(), username.into(), tx.clone()),
            tx,
            rx,
        }
    }

    #[tokio::test]
    async fn register_tracks_presence() {
        let hub = Hub::new();
        let p1 = player("p1", "alice", 16);
        let p2 = player("p2", "bob", 16);

        hub.register("ROOM01", p1.player).await;
        hub.register("ROOM01", p2.player).await;

        assert_eq!(hub.player_count("ROOM01").await, 2);
        assert_eq!(hub.active_player_count("ROOM01").await, 2);

        let mut names: Vec<String> = hub
            .players_in_room("ROOM01")
            .await
            .into_iter()
            .map(|p| p.username)
            .collect();
        names.sort();
        assert_eq!(names, vec!["alice".to_string(), "bob".to_string()]);
    }

    #[tokio::test]
    async fn unregister_drops_empty_rooms() {
        let hub = Hub::new();
        let p1 = player("p1", "alice", 16);

        hub.register("ROOM02", p1.player).await;
        hub.unregister("ROOM02", "p1").await;

        assert_eq!(hub.player_count("ROOM02").await, 0);
        assert!(hub.find_player("ROOM02", "p1").await.is_none());
    }

    #[tokio::test]
    async fn broadcast_reaches_players_in_order() {
        let hub = Hub::new();
        let mut p1 = player("p1", "alice", 16);
        hub.register("ROOM03", p1.player).await;

        hub.broadcast("ROOM03", GameEvent::new("first", json!({"n": 1})))
            .await;
        hub.broadcast("ROOM03", GameEvent::new("second", json!({"n": 2})))
            .await;

        let first = p1.rx.try_recv().expect("first event missing");
        let second = p1.rx.try_recv().expect("second event missing");
        assert_eq!(first.event_type, "first");
        assert_eq!(second.event_type, "second");
        assert_eq!(first.room_code.as_deref(), Some("ROOM03"));
    }

    #[tokio::test]
    async fn disconnect_keeps_identity_and_notifies_room() {
        let hub = Hub::new();
        let mut p1 = player("p1", "alice", 16);
        let p2 = player("p2", "bob", 16);

        hub.register("ROOM04", p1.player).await;
        hub.register("ROOM04", p2.player).await;

        hub.disconnect("ROOM04", "p2", &p2.tx).await;

        assert_eq!(hub.player_count("ROOM04").await, 2);
        assert_eq!(hub.active_player_count("ROOM04").await, 1);

        let stored = hub.find_player("ROOM04", "p2").await.expect("p2 missing");
        assert_eq!(stored.status, ConnectionStatus::Disconnected);
        assert_eq!(stored.username, "bob");

        let event = p1.rx.try_recv().expect("notification missing");
        assert_eq!(event.event_type, events::PLAYER_DISCONNECTED);
    }

    #[tokio::test]
    async fn stale_sender_cannot_disconnect_adopted_identity() {
        let hub = Hub::new();
        let p1 = player("p1", "alice", 16);
        hub.register("ROOM05", p1.player).await;

        // p1 reconnects: a fresh connection adopts the identity.
        let replacement = player("p1", "alice", 16);
        hub.unregister("ROOM05", "p1").await;
        hub.register("ROOM05", replacement.player).await;

        // The old connection's teardown must not touch the new record.
        hub.disconnect("ROOM05", "p1", &p1.tx).await;

        let stored = hub.find_player("ROOM05", "p1").await.expect("p1 missing");
        assert_eq!(stored.status, ConnectionStatus::Active);
    }

    #[tokio::test]
    async fn broadcast_skips_disconnected_players() {
        let hub = Hub::new();
        let mut p1 = player("p1", "alice", 16);
        let mut p2 = player("p2", "bob", 16);

        hub.register("ROOM06", p1.player).await;
        hub.register("ROOM06", p2.player).await;
        hub.disconnect("ROOM06", "p2", &p2.tx).await;

        // Drain the disconnect notification.
        while p1.rx.try_recv().is_ok() {}

        hub.broadcast("ROOM06", GameEvent::new("question", json!({})))
            .await;

        assert_eq!(
            p1.rx.try_recv().expect("p1 missed event").event_type,
            "question"
        );
        assert!(p2.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_buffer_degrades_to_disconnect_without_stalling_others() {
        let hub = Hub::new();
        let mut p1 = player("p1", "alice", 16);
        // p2 never drains its single-slot buffer.
        let p2 = player("p2", "bob", 1);

        hub.register("ROOM07", p1.player).await;
        hub.register("ROOM07", p2.player).await;

        hub.broadcast("ROOM07", GameEvent::new("first", json!({})))
            .await;
        hub.broadcast("ROOM07", GameEvent::new("second", json!({})))
            .await;

        assert_eq!(hub.active_player_count("ROOM07").await, 1);
        let stored = hub.find_player("ROOM07", "p2").await.expect("p2 missing");
        assert_eq!(stored.status, ConnectionStatus::Disconnected);

        // The healthy recipient saw both events.
        assert_eq!(p1.rx.try_recv().expect("first missing").event_type, "first");
        assert_eq!(
            p1.rx.try_recv().expect("second missing").event_type,
            "second"
        );
    }

    #[tokio::test]
    async fn send_to_player_requires_active_status() {
        let hub = Hub::new();
        let mut p1 = player("p1", "alice", 16);
        let tx = p1.tx.clone();

        hub.register("ROOM08", p1.player).await;
        assert!(
            hub.send_to_player("ROOM08", "p1", GameEvent::new("direct", json!({})))
                .await
        );
        assert_eq!(
            p1.rx.try_recv().expect("direct missing").event_type,
            "direct"
        );

        hub.disconnect("ROOM08", "p1", &tx).await;
        assert!(
            !hub.send_to_player("ROOM08", "p1", GameEvent::new("direct", json!({})))
                .await
        );
    }
}
