use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::error::{AppError, Result};
use crate::fetcher::fetch_feed;
use crate::leaderboard::RefreshOutcome;
use crate::state::ContestStore;

/// Everything a feed refresh touches. Cheap to clone into tasks.
#[derive(Clone)]
pub struct RefreshContext {
    pub client: reqwest::Client,
    pub store: Arc<ContestStore>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

/// Fetch one contest's feed and apply it. The ticket is taken before the
/// request goes out, so overlapping refreshes resolve to the newest one.
pub async fn refresh_contest(ctx: &RefreshContext, contest_id: &str) -> Result<RefreshOutcome> {
    let contest = ctx
        .store
        .contest(contest_id)
        .ok_or_else(|| AppError::UnknownContest(contest_id.to_string()))?;
    let ticket = ctx
        .store
        .begin_refresh(contest_id)
        .ok_or_else(|| AppError::UnknownContest(contest_id.to_string()))?;

    let started = Instant::now();
    let result = fetch_feed(&ctx.client, &contest.spreadsheet_url).await;
    ctx.latency.record(started.elapsed());

    match &result {
        Ok(_) => ctx.health.mark_refreshed(now_ns()),
        Err(e) => {
            ctx.health.inc_feed_failures();
            warn!(contest = contest_id, "Feed fetch failed: {e}");
        }
    }

    let outcome = ctx
        .store
        .apply_refresh(contest_id, ticket, result, Utc::now())
        .ok_or_else(|| AppError::UnknownContest(contest_id.to_string()))?;

    if outcome == RefreshOutcome::Stale {
        ctx.health.inc_stale_discarded();
        info!(contest = contest_id, ticket = ticket.seq(), "Superseded feed response discarded");
    }
    Ok(outcome)
}

/// Periodic re-fetch of one contest's feed.
pub struct FeedRefresher {
    ctx: RefreshContext,
    contest_id: String,
    interval_secs: u64,
}

impl FeedRefresher {
    pub fn new(ctx: RefreshContext, contest_id: String, interval_secs: u64) -> Self {
        Self { ctx, contest_id, interval_secs }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(self.interval_secs));
        ticker.tick().await; // skip immediate first tick, bootstrap already ran

        loop {
            ticker.tick().await;
            if let Err(e) = refresh_contest(&self.ctx, &self.contest_id).await {
                error!(contest = %self.contest_id, "Feed refresh failed: {e}");
            }
        }
    }
}

pub fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
