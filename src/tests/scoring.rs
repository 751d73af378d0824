#[cfg(test)]
mod tests {
    use crate::game::{
        models::{GameSettings, PlayerResult},
        service::{answers_match, assign_ranks, clean_for_comparison, score_for_order},
    };

    #[test]
    fn score_follows_answer_order() {
        assert_eq!(score_for_order(1), 1000);
        assert_eq!(score_for_order(2), 750);
        assert_eq!(score_for_order(3), 500);
        assert_eq!(score_for_order(4), 250);
        assert_eq!(score_for_order(9), 250);
    }

    #[test]
    fn exact_match_ignores_case_and_whitespace() {
        assert!(answers_match("paris", "Paris"));
        assert!(answers_match("  Paris  ", "Paris"));
        assert!(answers_match("PARIS", "paris"));
        assert!(!answers_match("london", "Paris"));
    }

    #[test]
    fn lowercase_match_handles_non_ascii() {
        assert!(answers_match("MÜNCHEN", "münchen"));
    }

    #[test]
    fn cleaned_match_strips_punctuation_and_spacing() {
        assert!(answers_match("Paris!", "Paris"));
        assert!(answers_match("the  nile,", "The Nile"));
        assert!(answers_match("\"Leonardo da Vinci\"", "Leonardo da Vinci"));
        assert!(!answers_match("Pari", "Paris"));
    }

    #[test]
    fn cleaning_is_idempotent() {
        let inputs = ["  The,  Answer!! ", "plain", "a  b   c", "(x) 'y'"];
        for input in inputs {
            let once = clean_for_comparison(input);
            assert_eq!(clean_for_comparison(&once), once);
        }
    }

    #[test]
    fn ranks_are_dense_with_ties() {
        let mut results: Vec<PlayerResult> = [1000, 1000, 750, 500, 500, 250]
            .iter()
            .enumerate()
            .map(|(i, score)| {
                let mut r = PlayerResult::new(format!("p{}", i), format!("player{}", i), 0);
                r.total_score = *score;
                r
            })
            .collect();

        assign_ranks(&mut results);

        let ranks: Vec<i32> = results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 1, 3, 4, 4, 6]);
    }

    #[test]
    fn higher_total_always_ranks_first() {
        let mut results: Vec<PlayerResult> = [2000, 1750, 250]
            .iter()
            .enumerate()
            .map(|(i, score)| {
                let mut r = PlayerResult::new(format!("p{}", i), format!("player{}", i), 0);
                r.total_score = *score;
                r
            })
            .collect();

        assign_ranks(&mut results);

        for pair in results.windows(2) {
            assert!(pair[0].total_score > pair[1].total_score);
            assert!(pair[0].rank < pair[1].rank);
        }
    }

    #[test]
    fn settings_normalize_to_defaults() {
        let empty = GameSettings::default();
        assert_eq!(empty.normalize(), (5, 30));

        let non_positive = GameSettings {
            max_rounds: Some(0),
            round_time: Some(-10),
        };
        assert_eq!(non_positive.normalize(), (5, 30));

        let custom = GameSettings {
            max_rounds: Some(3),
            round_time: Some(15),
        };
        assert_eq!(custom.normalize(), (3, 15));
    }
}
