use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MalformedRecord;

/// Username used for records that carry no handicapper name.
pub const ANONYMOUS: &str = "Anonymous";

// ---------------------------------------------------------------------------
// Bet records (external feed shape)
// ---------------------------------------------------------------------------

/// One submitted pick, as decoded from the feed. Fields are kept close to
/// the wire shape; interpretation happens in the leaderboard pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetRecord {
    /// Older feeds publish the handle as `twitterUsername`.
    #[serde(default, alias = "twitterUsername")]
    pub username: Option<String>,
    #[serde(default)]
    pub odds: Option<RawOdds>,
    /// `"won"`, `"lost"`, or null while the game is unsettled.
    #[serde(default)]
    pub bet_result: Option<String>,
    #[serde(default)]
    pub posted_time: Option<String>,
    #[serde(default)]
    pub research_tool_or_model_used: Option<String>,
    #[serde(default)]
    pub social_type: Option<String>,
}

/// Odds as they appear on the wire. Spreadsheet exports mix JSON numbers
/// with strings such as `"+150"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawOdds {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for RawOdds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawOdds::Integer(n) => write!(f, "{n}"),
            RawOdds::Float(x) => write!(f, "{x}"),
            RawOdds::Text(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetOutcome {
    Won,
    Lost,
    /// Not yet settled. Excluded from every aggregate.
    Pending,
}

impl BetRecord {
    /// Handle the record is credited to. Absent or empty names collapse
    /// into a single `"Anonymous"` entry.
    pub fn effective_username(&self) -> &str {
        match self.username.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => ANONYMOUS,
        }
    }

    /// Classify `betResult`. Matching is case-insensitive; an empty string
    /// is treated like null (unsettled).
    pub fn outcome(&self) -> Result<BetOutcome, MalformedRecord> {
        let Some(raw) = self.bet_result.as_deref() else {
            return Ok(BetOutcome::Pending);
        };
        let s = raw.trim();
        if s.eq_ignore_ascii_case("won") {
            Ok(BetOutcome::Won)
        } else if s.eq_ignore_ascii_case("lost") {
            Ok(BetOutcome::Lost)
        } else if s.is_empty() || s.eq_ignore_ascii_case("pending") {
            Ok(BetOutcome::Pending)
        } else {
            Err(MalformedRecord::UnknownResult(raw.to_string()))
        }
    }

    /// Research tool label, ignoring blank values.
    pub fn research_tool(&self) -> Option<&str> {
        self.research_tool_or_model_used
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}

/// Immutable snapshot of every record returned by one fetch.
pub type Feed = Vec<BetRecord>;

// ---------------------------------------------------------------------------
// Aggregates (derived, rebuilt on every recompute)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandicapperAggregate {
    pub username: String,
    /// Sum of odds across settled (won + lost) bets.
    pub total_odds: i64,
    pub total_won_odds: i64,
    pub number_of_bets: u32,
    pub number_of_bets_won: u32,
    /// `number_of_bets_won / number_of_bets * 100`.
    pub win_ratio: f64,
    /// Simulated payout of a $100 stake on every won bet.
    pub potential_wins: f64,
    /// Taken from the last record seen for this user. Order-sensitive.
    pub social_type: Option<String>,
    /// Distinct research tools in order of first appearance. Order-sensitive.
    pub research_tools: Vec<String>,
}

impl HandicapperAggregate {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            total_odds: 0,
            total_won_odds: 0,
            number_of_bets: 0,
            number_of_bets_won: 0,
            win_ratio: 0.0,
            potential_wins: 0.0,
            social_type: None,
            research_tools: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Time windows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    #[default]
    All,
    Day,
    Week,
    Month,
}

impl TimeWindow {
    /// Display order used by the TUI window selector.
    pub const SELECTABLE: [TimeWindow; 4] =
        [TimeWindow::All, TimeWindow::Day, TimeWindow::Week, TimeWindow::Month];

    pub fn label(&self) -> &'static str {
        match self {
            TimeWindow::All => "All",
            TimeWindow::Day => "Day",
            TimeWindow::Week => "Week",
            TimeWindow::Month => "Month",
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimeWindow::All => "all",
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(TimeWindow::All),
            "day" => Ok(TimeWindow::Day),
            "week" => Ok(TimeWindow::Week),
            "month" => Ok(TimeWindow::Month),
            other => Err(format!("unknown window {other:?} (expected all, day, week or month)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Contest configuration
// ---------------------------------------------------------------------------

/// Caller-supplied contest settings. Only `spreadsheet_url` (feed location)
/// and `contest_end_date` are interpreted; the rest is passed through.
/// Read as camelCase from the contests file, written as snake_case like the
/// rest of the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "snake_case", deserialize = "camelCase"))]
pub struct ContestConfig {
    pub id: String,
    pub contest_name: String,
    #[serde(default)]
    pub primary_image_url: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    pub spreadsheet_url: String,
    #[serde(default)]
    pub sponsored: bool,
    #[serde(default)]
    pub contest_end_date: Option<String>,
}

impl ContestConfig {
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.contest_end_date
            .as_deref()
            .and_then(crate::leaderboard::window::parse_posted_time)
    }

    /// Time left until the contest closes, floored at zero. None when no
    /// (parseable) end date is configured.
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let end = self.end_time()?;
        Some((end - now).max(chrono::Duration::zero()))
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_time().is_some_and(|end| end <= now)
    }
}
