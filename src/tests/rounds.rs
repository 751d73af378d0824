#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use dashmap::DashMap;
    use uuid::Uuid;

    use crate::{
        game::{
            models::RoundAnswer,
            service::{RoundTimer, claim_round_end},
        },
        round::models::PlayerAnswer,
    };

    fn stored_answer(player_id: &str, answer: &str, score: i32, order: i32) -> PlayerAnswer {
        PlayerAnswer {
            id: Uuid::new_v4(),
            round_id: Uuid::new_v4(),
            player_id: player_id.into(),
            answer: answer.into(),
            score,
            answer_order: order,
            answered_at: Utc::now(),
        }
    }

    #[test]
    fn only_one_claim_succeeds() {
        let timers = DashMap::new();
        timers.insert("ROOM42".to_string(), RoundTimer { round_number: 1 });

        assert!(claim_round_end(&timers, "ROOM42", 1));
        assert!(!claim_round_end(&timers, "ROOM42", 1));
    }

    #[test]
    fn stale_round_cannot_claim() {
        let timers = DashMap::new();
        timers.insert("ROOM42".to_string(), RoundTimer { round_number: 2 });

        // A leftover claim from round 1 must not end round 2.
        assert!(!claim_round_end(&timers, "ROOM42", 1));
        assert!(timers.contains_key("ROOM42"));
    }

    #[test]
    fn round_answer_uses_wire_names_only() {
        let row = stored_answer("p1", "Paris", 1000, 1);
        let value = serde_json::to_value(RoundAnswer::from(&row)).unwrap();

        assert_eq!(value["player_id"], "p1");
        assert_eq!(value["answer_text"], "Paris");
        assert_eq!(value["score"], 1000);
        assert_eq!(value["order"], 1);

        // Storage columns stay off the wire.
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 4);
        assert!(value.get("id").is_none());
        assert!(value.get("round_id").is_none());
        assert!(value.get("answered_at").is_none());
    }

    #[test]
    fn round_answers_keep_order_and_incorrect_entries() {
        let rows = vec![
            stored_answer("p3", "london", 0, 0),
            stored_answer("p1", "paris", 1000, 1),
            stored_answer("p2", "Paris!", 750, 2),
        ];

        let answers: Vec<RoundAnswer> = rows.iter().map(RoundAnswer::from).collect();
        let value = serde_json::to_value(&answers).unwrap();

        assert_eq!(value.as_array().unwrap().len(), 3);
        assert_eq!(value[0]["order"], 0);
        assert_eq!(value[0]["score"], 0);
        assert_eq!(value[1]["player_id"], "p1");
        assert_eq!(value[1]["answer_text"], "paris");
        assert_eq!(value[2]["order"], 2);
    }

    #[tokio::test]
    async fn racing_claims_yield_exactly_one_winner() {
        let timers = Arc::new(DashMap::new());
        timers.insert("ROOM42".to_string(), RoundTimer { round_number: 1 });

        let mut handles = Vec::new();
        for _ in 0..16 {
            let timers = Arc::clone(&timers);
            handles.push(tokio::spawn(async move {
                claim_round_end(&timers, "ROOM42", 1)
            }));
        }

        let results = futures::future::join_all(handles).await;
        let wins = results
            .into_iter()
            .filter(|r| *r.as_ref().unwrap())
            .count();

        assert_eq!(wins, 1);
    }
}
