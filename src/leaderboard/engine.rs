use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::FeedError;
use crate::leaderboard::aggregator::{aggregate, SkipStats};
use crate::leaderboard::ranker::rank;
use crate::leaderboard::window::filter_window;
use crate::types::{Feed, HandicapperAggregate, TimeWindow};

// ---------------------------------------------------------------------------
// Pure pipeline
// ---------------------------------------------------------------------------

/// Inputs to one leaderboard computation.
#[derive(Debug, Clone, Default)]
pub struct LeaderboardState {
    pub feed: Arc<Feed>,
    pub window: TimeWindow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub window: TimeWindow,
    pub computed_at: DateTime<Utc>,
    pub entries: Vec<HandicapperAggregate>,
    pub skipped: SkipStats,
}

impl Leaderboard {
    pub fn empty(window: TimeWindow, now: DateTime<Utc>) -> Self {
        Self { window, computed_at: now, entries: Vec::new(), skipped: SkipStats::default() }
    }
}

/// Filter → Aggregate → Rank. Same state and `now` always give the same
/// leaderboard.
pub fn compute(state: &LeaderboardState, now: DateTime<Utc>) -> Leaderboard {
    let filtered = filter_window(&state.feed, state.window, now);
    let aggregation = aggregate(filtered.records);

    let mut skipped = aggregation.skipped;
    skipped.unparseable_time = filtered.unparseable_time;

    Leaderboard {
        window: state.window,
        computed_at: now,
        entries: rank(aggregation.handicappers),
        skipped,
    }
}

// ---------------------------------------------------------------------------
// Stateful engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeedStatus {
    /// No fetch has completed yet.
    Empty,
    Loaded { fetched_at: DateTime<Utc>, records: usize },
    /// Last applied fetch failed; the feed was reset to empty.
    Unavailable { failed_at: DateTime<Utc>, reason: String },
}

/// Issued when a fetch starts. Only the newest ticket's result is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn seq(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer fetch had already been applied; this result was discarded.
    Stale,
}

/// Holds the current feed and window and keeps the leaderboard in step with
/// them. Recomputes synchronously on every input change.
#[derive(Debug)]
pub struct LeaderboardEngine {
    state: LeaderboardState,
    status: FeedStatus,
    issued_seq: u64,
    applied_seq: u64,
    current: Leaderboard,
}

impl LeaderboardEngine {
    pub fn new(window: TimeWindow, now: DateTime<Utc>) -> Self {
        Self {
            state: LeaderboardState { feed: Arc::new(Vec::new()), window },
            status: FeedStatus::Empty,
            issued_seq: 0,
            applied_seq: 0,
            current: Leaderboard::empty(window, now),
        }
    }

    pub fn window(&self) -> TimeWindow {
        self.state.window
    }

    pub fn feed(&self) -> &Arc<Feed> {
        &self.state.feed
    }

    pub fn status(&self) -> &FeedStatus {
        &self.status
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.current
    }

    /// Select a window. Recomputes from the held feed; never re-fetches.
    pub fn set_window(&mut self, window: TimeWindow, now: DateTime<Utc>) {
        if window == self.state.window {
            return;
        }
        self.state.window = window;
        self.recompute(now);
    }

    /// Replace the feed snapshot outright (no ticket check).
    pub fn set_feed(&mut self, feed: Feed, now: DateTime<Utc>) {
        self.status = FeedStatus::Loaded { fetched_at: now, records: feed.len() };
        self.state.feed = Arc::new(feed);
        self.recompute(now);
    }

    /// Rebuild from current inputs. Relative windows drift as time passes,
    /// so callers re-run this on a clock tick.
    pub fn recompute(&mut self, now: DateTime<Utc>) {
        self.current = compute(&self.state, now);
        debug!(
            window = %self.state.window,
            records = self.state.feed.len(),
            handicappers = self.current.entries.len(),
            malformed = self.current.skipped.malformed(),
            "Leaderboard recomputed"
        );
    }

    /// Compute for another window without touching engine state.
    pub fn view(&self, window: TimeWindow, now: DateTime<Utc>) -> Leaderboard {
        compute(&LeaderboardState { feed: Arc::clone(&self.state.feed), window }, now)
    }

    pub fn begin_refresh(&mut self) -> FetchTicket {
        self.issued_seq += 1;
        FetchTicket(self.issued_seq)
    }

    /// Apply a completed fetch if no newer one has been applied. A failed
    /// fetch resets the feed to empty and records the reason.
    pub fn apply_refresh(
        &mut self,
        ticket: FetchTicket,
        result: Result<Feed, FeedError>,
        now: DateTime<Utc>,
    ) -> RefreshOutcome {
        if ticket.0 <= self.applied_seq {
            warn!(
                ticket = ticket.0,
                applied = self.applied_seq,
                "Discarding stale feed response"
            );
            return RefreshOutcome::Stale;
        }
        self.applied_seq = ticket.0;

        match result {
            Ok(feed) => {
                info!(ticket = ticket.0, records = feed.len(), "Feed snapshot applied");
                self.set_feed(feed, now);
            }
            Err(e) => {
                warn!(ticket = ticket.0, "Feed unavailable, falling back to empty feed: {e}");
                self.state.feed = Arc::new(Vec::new());
                self.status = FeedStatus::Unavailable { failed_at: now, reason: e.to_string() };
                self.recompute(now);
            }
        }
        RefreshOutcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::odds::round_cents;
    use crate::types::{BetRecord, RawOdds};
    use chrono::{TimeDelta, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 10, 20, 0, 0).unwrap()
    }

    fn bet(user: &str, odds: i64, result: Option<&str>, hours_ago: i64) -> BetRecord {
        BetRecord {
            username: Some(user.to_string()),
            odds: Some(RawOdds::Integer(odds)),
            bet_result: result.map(str::to_string),
            posted_time: Some((now() - TimeDelta::hours(hours_ago)).to_rfc3339()),
            ..Default::default()
        }
    }

    fn scenario_feed() -> Feed {
        vec![
            bet("A", 150, Some("won"), 1),
            bet("A", -200, Some("lost"), 30),
            bet("B", -150, Some("won"), 2),
        ]
    }

    #[test]
    fn reference_scenario_ranks_by_potential_wins() {
        let state = LeaderboardState { feed: Arc::new(scenario_feed()), window: TimeWindow::All };
        let board = compute(&state, now());

        assert_eq!(board.entries.len(), 2);
        assert_eq!(board.entries[0].username, "A");
        assert_eq!(round_cents(board.entries[0].potential_wins), 150.00);
        assert_eq!(board.entries[1].username, "B");
        assert_eq!(round_cents(board.entries[1].potential_wins), 66.67);
        assert!((board.entries[1].win_ratio - 100.0).abs() < 1e-9);
        assert!((board.entries[0].win_ratio - 50.0).abs() < 1e-9);
    }

    #[test]
    fn empty_feed_gives_empty_leaderboard() {
        let state = LeaderboardState::default();
        let board = compute(&state, now());
        assert!(board.entries.is_empty());
        assert_eq!(board.skipped, SkipStats::default());
    }

    #[test]
    fn skipped_counts_merge_filter_and_aggregator() {
        let mut feed = scenario_feed();
        feed.push(BetRecord {
            posted_time: Some("not a date".to_string()),
            ..bet("C", 200, Some("won"), 0)
        });
        feed.push(bet("D", 110, None, 1));
        let state = LeaderboardState { feed: Arc::new(feed), window: TimeWindow::Day };

        let board = compute(&state, now());
        assert_eq!(board.skipped.unparseable_time, 1);
        assert_eq!(board.skipped.pending, 1);
        assert_eq!(board.skipped.malformed(), 1);
        assert!(board.entries.iter().all(|h| h.username != "C"));

        let all = compute(&LeaderboardState { window: TimeWindow::All, ..state }, now());
        assert_eq!(all.skipped.unparseable_time, 0);
        assert!(all.entries.iter().any(|h| h.username == "C"));
    }

    #[test]
    fn compute_is_idempotent() {
        let state = LeaderboardState { feed: Arc::new(scenario_feed()), window: TimeWindow::Day };
        assert_eq!(compute(&state, now()), compute(&state, now()));
    }

    #[test]
    fn output_is_non_increasing_in_potential_wins() {
        let feed: Feed = (0..30)
            .map(|i| bet(&format!("u{}", i % 9), if i % 2 == 0 { 100 + i } else { -105 - i }, Some("won"), i))
            .collect();
        let board = compute(&LeaderboardState { feed: Arc::new(feed), window: TimeWindow::All }, now());
        assert!(board.entries.windows(2).all(|w| w[0].potential_wins >= w[1].potential_wins));
    }

    #[test]
    fn window_change_recomputes_without_refetch() {
        let mut engine = LeaderboardEngine::new(TimeWindow::All, now());
        let ticket = engine.begin_refresh();
        engine.apply_refresh(ticket, Ok(scenario_feed()), now());
        assert_eq!(engine.leaderboard().entries[0].number_of_bets, 2);

        engine.set_window(TimeWindow::Day, now());
        let a = &engine.leaderboard().entries[0];
        assert_eq!(a.username, "A");
        assert_eq!(a.number_of_bets, 1, "30h-old loss is outside the day window");
        assert_eq!(engine.leaderboard().window, TimeWindow::Day);
        assert_eq!(engine.feed().len(), 3);
    }

    #[test]
    fn stale_response_does_not_overwrite_newer_feed() {
        let mut engine = LeaderboardEngine::new(TimeWindow::All, now());
        let first = engine.begin_refresh();
        let second = engine.begin_refresh();

        let fresh = vec![bet("fresh", 200, Some("won"), 1)];
        let stale = vec![bet("stale", 500, Some("won"), 1)];

        assert_eq!(engine.apply_refresh(second, Ok(fresh), now()), RefreshOutcome::Applied);
        assert_eq!(engine.apply_refresh(first, Ok(stale), now()), RefreshOutcome::Stale);

        assert_eq!(engine.leaderboard().entries.len(), 1);
        assert_eq!(engine.leaderboard().entries[0].username, "fresh");
    }

    #[test]
    fn failed_fetch_defaults_to_empty_feed() {
        let mut engine = LeaderboardEngine::new(TimeWindow::All, now());
        let t1 = engine.begin_refresh();
        engine.apply_refresh(t1, Ok(scenario_feed()), now());
        assert!(!engine.leaderboard().entries.is_empty());

        let t2 = engine.begin_refresh();
        let outcome = engine.apply_refresh(t2, Err(FeedError::NotAnArray), now());

        assert_eq!(outcome, RefreshOutcome::Applied);
        assert!(engine.leaderboard().entries.is_empty());
        assert!(engine.feed().is_empty());
        assert!(matches!(engine.status(), FeedStatus::Unavailable { .. }));
    }

    #[test]
    fn view_leaves_engine_window_untouched() {
        let mut engine = LeaderboardEngine::new(TimeWindow::All, now());
        engine.set_feed(scenario_feed(), now());

        let day = engine.view(TimeWindow::Day, now());
        assert_eq!(day.window, TimeWindow::Day);
        assert_eq!(engine.window(), TimeWindow::All);
        assert_eq!(engine.leaderboard().entries[0].number_of_bets, 2);
        assert!(matches!(engine.status(), FeedStatus::Loaded { records: 3, .. }));
    }
}
