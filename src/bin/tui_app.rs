use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use handicapper_leaderboard::error::FeedError;
use handicapper_leaderboard::fetcher::fetch_feed;
use handicapper_leaderboard::leaderboard::{FeedStatus, FetchTicket, LeaderboardEngine, RefreshOutcome};
use handicapper_leaderboard::types::{ContestConfig, Feed, TimeWindow};

// ---------------------------------------------------------------------------
// Fetch results routed back to the UI loop
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FetchDone {
    pub ticket: FetchTicket,
    pub result: Result<Feed, FeedError>,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug)]
pub struct AppState {
    pub contest: ContestConfig,
    pub engine: LeaderboardEngine,
    pub status: ConnectionStatus,
    /// Fetches started but not yet answered.
    pub in_flight: usize,
    pub last_refresh: Option<Instant>,
}

impl AppState {
    pub fn new(contest: ContestConfig, window: TimeWindow, now: DateTime<Utc>) -> Self {
        Self {
            contest,
            engine: LeaderboardEngine::new(window, now),
            status: ConnectionStatus::Connecting,
            in_flight: 0,
            last_refresh: None,
        }
    }

    /// Kick off a feed fetch on a background task. The result comes back on
    /// `tx` tagged with its ticket.
    pub fn start_fetch(&mut self, client: &reqwest::Client, tx: &mpsc::Sender<FetchDone>) -> FetchTicket {
        let ticket = self.engine.begin_refresh();
        self.in_flight += 1;

        let client = client.clone();
        let url = self.contest.spreadsheet_url.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = fetch_feed(&client, &url).await;
            let _ = tx.send(FetchDone { ticket, result }).await;
        });
        ticket
    }

    pub fn on_fetch_done(&mut self, done: FetchDone, now: DateTime<Utc>) -> RefreshOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);
        let error = done.result.as_ref().err().map(|e| e.to_string());

        let outcome = self.engine.apply_refresh(done.ticket, done.result, now);
        if outcome == RefreshOutcome::Applied {
            self.status = match error {
                Some(e) => ConnectionStatus::Error(e),
                None => ConnectionStatus::Connected,
            };
            self.last_refresh = Some(Instant::now());
        }
        outcome
    }

    /// Window switches recompute from the held feed only.
    pub fn select_window(&mut self, window: TimeWindow, now: DateTime<Utc>) {
        self.engine.set_window(window, now);
    }

    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.engine.recompute(now);
    }

    pub fn feed_label(&self) -> String {
        match self.engine.status() {
            FeedStatus::Empty => "no data yet".to_string(),
            FeedStatus::Loaded { records, .. } => format!("{records} picks"),
            FeedStatus::Unavailable { .. } => "no data".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_money(v: f64) -> String {
    format!("${v:.2}")
}

pub fn format_record(won: u32, total: u32, win_ratio: f64) -> String {
    format!("({won} / {total}) {win_ratio:.2}%")
}

pub fn format_remaining(remaining: Option<chrono::Duration>) -> String {
    match remaining {
        None => "no end date".to_string(),
        Some(d) if d <= chrono::Duration::zero() => "contest has ended".to_string(),
        Some(d) => {
            let secs = d.num_seconds();
            format!(
                "{} days {} hours {} minutes {} seconds",
                secs / 86_400,
                (secs / 3600) % 24,
                (secs / 60) % 60,
                secs % 60
            )
        }
    }
}

pub fn format_age(since_refresh: Option<std::time::Duration>) -> String {
    match since_refresh {
        None => "never updated".to_string(),
        Some(d) if d.as_secs() < 60 => format!("updated {}s ago", d.as_secs()),
        Some(d) => format!("updated {}m ago", d.as_secs() / 60),
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handicapper_leaderboard::types::{BetRecord, RawOdds};

    fn contest() -> ContestConfig {
        ContestConfig {
            id: "main".to_string(),
            contest_name: "Monthly Pick'em".to_string(),
            primary_image_url: None,
            price: Some("$100".to_string()),
            spreadsheet_url: "http://127.0.0.1:9/feed".to_string(),
            sponsored: false,
            contest_end_date: None,
        }
    }

    fn won(user: &str, odds: i64) -> BetRecord {
        BetRecord {
            username: Some(user.to_string()),
            odds: Some(RawOdds::Integer(odds)),
            bet_result: Some("won".to_string()),
            posted_time: Some(Utc::now().to_rfc3339()),
            ..Default::default()
        }
    }

    #[test]
    fn late_stale_fetch_is_ignored() {
        let mut app = AppState::new(contest(), TimeWindow::All, Utc::now());
        let first = app.engine.begin_refresh();
        let second = app.engine.begin_refresh();
        app.in_flight = 2;

        let applied = app.on_fetch_done(FetchDone { ticket: second, result: Ok(vec![won("new", 110)]) }, Utc::now());
        let stale = app.on_fetch_done(FetchDone { ticket: first, result: Ok(vec![won("old", 900)]) }, Utc::now());

        assert_eq!(applied, RefreshOutcome::Applied);
        assert!(app.last_refresh.is_some());
        assert_eq!(stale, RefreshOutcome::Stale);
        assert_eq!(app.in_flight, 0);
        assert_eq!(app.status, ConnectionStatus::Connected);
        assert_eq!(app.engine.leaderboard().entries[0].username, "new");
    }

    #[test]
    fn failed_fetch_shows_error_and_no_data() {
        let mut app = AppState::new(contest(), TimeWindow::All, Utc::now());
        let ticket = app.engine.begin_refresh();
        app.on_fetch_done(FetchDone { ticket, result: Err(FeedError::Status(404)) }, Utc::now());

        assert!(matches!(app.status, ConnectionStatus::Error(_)));
        assert_eq!(app.feed_label(), "no data");
        assert!(app.engine.leaderboard().entries.is_empty());
    }

    #[test]
    fn selecting_window_keeps_feed() {
        let mut app = AppState::new(contest(), TimeWindow::All, Utc::now());
        let ticket = app.engine.begin_refresh();
        app.on_fetch_done(FetchDone { ticket, result: Ok(vec![won("A", 150)]) }, Utc::now());

        app.select_window(TimeWindow::Week, Utc::now());
        assert_eq!(app.engine.window(), TimeWindow::Week);
        assert_eq!(app.engine.leaderboard().entries.len(), 1);
        assert_eq!(app.feed_label(), "1 picks");
    }

    #[test]
    fn formats_leaderboard_cells() {
        assert_eq!(format_money(66.666_666), "$66.67");
        assert_eq!(format_record(1, 2, 50.0), "(1 / 2) 50.00%");
        assert_eq!(format_remaining(Some(chrono::Duration::zero())), "contest has ended");
        assert_eq!(
            format_remaining(Some(chrono::Duration::seconds(90_061))),
            "1 days 1 hours 1 minutes 1 seconds"
        );
        assert_eq!(format_age(None), "never updated");
        assert_eq!(format_age(Some(std::time::Duration::from_secs(42))), "updated 42s ago");
        assert_eq!(format_age(Some(std::time::Duration::from_secs(185))), "updated 3m ago");
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
