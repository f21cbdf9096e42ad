use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::HandicapperAggregate;

/// Leaderboard order: `potential_wins` desc, then `win_ratio` desc, then
/// `username` asc. The result is independent of map iteration order.
pub fn rank(handicappers: HashMap<String, HandicapperAggregate>) -> Vec<HandicapperAggregate> {
    let mut ranked: Vec<HandicapperAggregate> = handicappers.into_values().collect();
    ranked.sort_by(compare);
    ranked
}

pub fn compare(a: &HandicapperAggregate, b: &HandicapperAggregate) -> Ordering {
    b.potential_wins
        .total_cmp(&a.potential_wins)
        .then_with(|| b.win_ratio.total_cmp(&a.win_ratio))
        .then_with(|| a.username.cmp(&b.username))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, potential_wins: f64, win_ratio: f64) -> HandicapperAggregate {
        HandicapperAggregate {
            potential_wins,
            win_ratio,
            ..HandicapperAggregate::new(name)
        }
    }

    fn names(v: &[HandicapperAggregate]) -> Vec<&str> {
        v.iter().map(|h| h.username.as_str()).collect()
    }

    fn to_map(entries: Vec<HandicapperAggregate>) -> HashMap<String, HandicapperAggregate> {
        entries.into_iter().map(|h| (h.username.clone(), h)).collect()
    }

    #[test]
    fn sorts_by_potential_wins_descending() {
        let ranked = rank(to_map(vec![
            entry("low", 10.0, 100.0),
            entry("high", 500.0, 10.0),
            entry("mid", 90.91, 50.0),
        ]));
        assert_eq!(names(&ranked), vec!["high", "mid", "low"]);
        assert!(ranked.windows(2).all(|w| w[0].potential_wins >= w[1].potential_wins));
    }

    #[test]
    fn ties_break_on_win_ratio_then_username() {
        let ranked = rank(to_map(vec![
            entry("carol", 150.0, 50.0),
            entry("bob", 150.0, 75.0),
            entry("alice", 150.0, 50.0),
        ]));
        assert_eq!(names(&ranked), vec!["bob", "alice", "carol"]);
    }

    #[test]
    fn empty_input_ranks_empty() {
        assert!(rank(HashMap::new()).is_empty());
    }
}
