//! Recency filter applied before aggregation.
//!
//! A record passes a window when it was posted strictly after
//! `now - window`. `Month` is a calendar month (clamped to the last day of
//! shorter months), not a fixed 30 days.

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use tracing::debug;

use crate::error::MalformedRecord;
use crate::types::{BetRecord, TimeWindow};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO 8601 timestamp. Offsets are honoured; naive timestamps and
/// bare dates are taken as UTC.
pub fn parse_posted_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl TimeWindow {
    /// Oldest instant (exclusive) a record may be posted at to pass.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeWindow::All => None,
            TimeWindow::Day => Some(now - TimeDelta::days(1)),
            TimeWindow::Week => Some(now - TimeDelta::weeks(1)),
            TimeWindow::Month => Some(
                now.checked_sub_months(Months::new(1))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC),
            ),
        }
    }
}

/// Records selected for one window.
#[derive(Debug, Clone, Default)]
pub struct FilteredFeed<'a> {
    pub records: Vec<&'a BetRecord>,
    /// Dropped because `postedTime` was absent or not parseable.
    pub unparseable_time: u32,
}

pub fn filter_window(feed: &[BetRecord], window: TimeWindow, now: DateTime<Utc>) -> FilteredFeed<'_> {
    let Some(cutoff) = window.cutoff(now) else {
        return FilteredFeed { records: feed.iter().collect(), unparseable_time: 0 };
    };

    let mut out = FilteredFeed::default();
    for bet in feed {
        match posted_at(bet) {
            Ok(posted) => {
                if posted > cutoff {
                    out.records.push(bet);
                }
            }
            Err(e) => {
                debug!(user = bet.effective_username(), %window, "Skipping bet: {e}");
                out.unparseable_time += 1;
            }
        }
    }
    out
}

/// Posting time of a record; absent and unparseable values are malformed.
pub fn posted_at(bet: &BetRecord) -> Result<DateTime<Utc>, MalformedRecord> {
    let raw = bet.posted_time.as_deref().unwrap_or_default();
    parse_posted_time(raw).ok_or_else(|| MalformedRecord::UnparseablePostedTime(raw.to_string()))
}
