use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::error::FeedError;
use crate::leaderboard::{FeedStatus, FetchTicket, Leaderboard, LeaderboardEngine, RefreshOutcome};
use crate::types::{ContestConfig, Feed, TimeWindow};

// ---------------------------------------------------------------------------
// ContestSlot
// ---------------------------------------------------------------------------

/// One configured contest and the engine holding its current feed.
#[derive(Debug)]
struct ContestSlot {
    config: ContestConfig,
    engine: LeaderboardEngine,
}

/// Read-only view of a contest for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ContestSummary {
    pub contest: ContestConfig,
    pub feed: FeedStatus,
    pub default_window: TimeWindow,
    pub handicappers: usize,
    /// None when no end date is configured.
    pub seconds_remaining: Option<i64>,
    pub ended: bool,
}

// ---------------------------------------------------------------------------
// ContestStore
// ---------------------------------------------------------------------------

/// contest_id → contest config + engine. Guards are never held across an
/// await: callers take a ticket, fetch, then apply.
pub struct ContestStore {
    contests: DashMap<String, ContestSlot>,
}

impl ContestStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, config: ContestConfig, window: TimeWindow, now: DateTime<Utc>) {
        let engine = LeaderboardEngine::new(window, now);
        self.contests.insert(config.id.clone(), ContestSlot { config, engine });
    }

    pub fn contains(&self, contest_id: &str) -> bool {
        self.contests.contains_key(contest_id)
    }

    pub fn contest(&self, contest_id: &str) -> Option<ContestConfig> {
        self.contests.get(contest_id).map(|s| s.config.clone())
    }

    pub fn contest_count(&self) -> usize {
        self.contests.len()
    }

    /// Ids in ascending order.
    pub fn contest_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.contests.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn summary(&self, contest_id: &str, now: DateTime<Utc>) -> Option<ContestSummary> {
        let slot = self.contests.get(contest_id)?;
        Some(summarize(&slot, now))
    }

    pub fn summaries(&self, now: DateTime<Utc>) -> Vec<ContestSummary> {
        let mut out: Vec<ContestSummary> =
            self.contests.iter().map(|e| summarize(e.value(), now)).collect();
        out.sort_by(|a, b| a.contest.id.cmp(&b.contest.id));
        out
    }

    pub fn begin_refresh(&self, contest_id: &str) -> Option<FetchTicket> {
        let mut slot = self.contests.get_mut(contest_id)?;
        Some(slot.engine.begin_refresh())
    }

    pub fn apply_refresh(
        &self,
        contest_id: &str,
        ticket: FetchTicket,
        result: Result<Feed, FeedError>,
        now: DateTime<Utc>,
    ) -> Option<RefreshOutcome> {
        let mut slot = self.contests.get_mut(contest_id)?;
        Some(slot.engine.apply_refresh(ticket, result, now))
    }

    /// Leaderboard for `window` over the contest's current snapshot.
    pub fn leaderboard(
        &self,
        contest_id: &str,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> Option<Leaderboard> {
        let slot = self.contests.get(contest_id)?;
        Some(slot.engine.view(window, now))
    }
}

impl Default for ContestStore {
    fn default() -> Self {
        Self { contests: DashMap::new() }
    }
}

fn summarize(slot: &ContestSlot, now: DateTime<Utc>) -> ContestSummary {
    ContestSummary {
        contest: slot.config.clone(),
        feed: slot.engine.status().clone(),
        default_window: slot.engine.window(),
        handicappers: slot.engine.view(slot.engine.window(), now).entries.len(),
        seconds_remaining: slot.config.time_remaining(now).map(|d| d.num_seconds()),
        ended: slot.config.has_ended(now),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BetRecord, RawOdds};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 20, 9, 0, 0).unwrap()
    }

    fn contest(id: &str) -> ContestConfig {
        ContestConfig {
            id: id.to_string(),
            contest_name: format!("{id} contest"),
            primary_image_url: None,
            price: Some("$100 gift card".to_string()),
            spreadsheet_url: format!("http://feeds/{id}"),
            sponsored: false,
            contest_end_date: Some("2024-11-30T23:59:00Z".to_string()),
        }
    }

    fn won(user: &str, odds: i64) -> BetRecord {
        BetRecord {
            username: Some(user.to_string()),
            odds: Some(RawOdds::Integer(odds)),
            bet_result: Some("won".to_string()),
            posted_time: Some("2024-11-20T08:00:00Z".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn unknown_contest_returns_none() {
        let store = ContestStore::new();
        assert!(store.begin_refresh("nope").is_none());
        assert!(store.leaderboard("nope", TimeWindow::All, now()).is_none());
        assert!(store.summary("nope", now()).is_none());
    }

    #[test]
    fn applied_feed_is_visible_in_leaderboard_and_summary() {
        let store = ContestStore::new();
        store.register(contest("nfl"), TimeWindow::All, now());

        let ticket = store.begin_refresh("nfl").unwrap();
        let outcome = store.apply_refresh("nfl", ticket, Ok(vec![won("A", 120), won("B", 300)]), now());
        assert_eq!(outcome, Some(RefreshOutcome::Applied));

        let board = store.leaderboard("nfl", TimeWindow::Day, now()).unwrap();
        assert_eq!(board.entries[0].username, "B");

        let summary = store.summary("nfl", now()).unwrap();
        assert_eq!(summary.handicappers, 2);
        assert!(!summary.ended);
        assert!(summary.seconds_remaining.unwrap() > 0);
        assert!(matches!(summary.feed, FeedStatus::Loaded { records: 2, .. }));
    }

    #[test]
    fn summary_count_follows_the_clock_for_relative_windows() {
        let store = ContestStore::new();
        store.register(contest("nhl"), TimeWindow::Day, now());

        let t = store.begin_refresh("nhl").unwrap();
        store.apply_refresh("nhl", t, Ok(vec![won("A", 120)]), now());
        assert_eq!(store.summary("nhl", now()).unwrap().handicappers, 1);

        let next_day = now() + chrono::TimeDelta::days(1);
        assert_eq!(store.summary("nhl", next_day).unwrap().handicappers, 0);
        assert_eq!(store.summaries(next_day)[0].handicappers, 0);
    }

    #[test]
    fn contests_are_isolated_and_listed_in_id_order() {
        let store = ContestStore::new();
        store.register(contest("nfl"), TimeWindow::All, now());
        store.register(contest("mlb"), TimeWindow::All, now());

        let t = store.begin_refresh("nfl").unwrap();
        store.apply_refresh("nfl", t, Ok(vec![won("A", 120)]), now());

        assert!(store.leaderboard("mlb", TimeWindow::All, now()).unwrap().entries.is_empty());
        assert_eq!(store.contest_ids(), vec!["mlb".to_string(), "nfl".to_string()]);
        let ids: Vec<String> = store.summaries(now()).into_iter().map(|s| s.contest.id).collect();
        assert_eq!(ids, vec!["mlb".to_string(), "nfl".to_string()]);
    }

    #[test]
    fn interleaved_refreshes_keep_newest() {
        let store = ContestStore::new();
        store.register(contest("nba"), TimeWindow::All, now());

        let older = store.begin_refresh("nba").unwrap();
        let newer = store.begin_refresh("nba").unwrap();
        store.apply_refresh("nba", newer, Ok(vec![won("new", 150)]), now());
        let outcome = store.apply_refresh("nba", older, Ok(vec![won("old", 900)]), now());

        assert_eq!(outcome, Some(RefreshOutcome::Stale));
        let board = store.leaderboard("nba", TimeWindow::All, now()).unwrap();
        assert_eq!(board.entries.len(), 1);
        assert_eq!(board.entries[0].username, "new");
    }
}
