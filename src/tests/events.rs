#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::ws::events::{self, GameEvent};

    #[test]
    fn envelope_omits_empty_fields() {
        let event = GameEvent::new(events::TIMER_UPDATE, json!({"remaining": 10}));
        let text = serde_json::to_string(&event).unwrap();

        assert!(text.contains("\"type\":\"timer_update\""));
        assert!(!text.contains("room_code"));
        assert!(!text.contains("error"));
    }

    #[test]
    fn error_event_carries_message() {
        let event = GameEvent::error("room is full");
        assert_eq!(event.event_type, events::ERROR);
        assert_eq!(event.error.as_deref(), Some("room is full"));
        assert!(event.data.is_none());
    }

    #[test]
    fn inbound_frame_parses_type_and_payload() {
        let raw = r#"{"type":"join_room","data":{"room_code":"ABCDEF","username":"alice"}}"#;
        let event: GameEvent = serde_json::from_str(raw).unwrap();

        assert_eq!(event.event_type, events::JOIN_ROOM);
        let data = event.data.unwrap();
        assert_eq!(data["room_code"], "ABCDEF");
        assert_eq!(data["username"], "alice");
    }

    #[test]
    fn frame_without_payload_still_parses() {
        let event: GameEvent = serde_json::from_str(r#"{"type":"leave_room"}"#).unwrap();
        assert_eq!(event.event_type, events::LEAVE_ROOM);
        assert!(event.data.is_none());
    }
}
