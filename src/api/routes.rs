use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::api::health::HealthState;
use crate::api::latency::{LatencySnapshot, LatencyStats};
use crate::error::AppError;
use crate::leaderboard::SkipStats;
use crate::refresher::{refresh_contest, RefreshContext};
use crate::state::{ContestStore, ContestSummary};
use crate::types::{HandicapperAggregate, TimeWindow};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<ContestStore>,
    pub refresh: RefreshContext,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
    pub default_window: TimeWindow,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/contests", get(get_contests))
        .route("/contests/:id", get(get_contest))
        .route("/contests/:id/leaderboard", get(get_leaderboard))
        .route("/contests/:id/refresh", post(post_refresh))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    pub window: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub contests: usize,
    pub last_refresh_at_ns: u64,
    pub feed_failures: u64,
    pub stale_discarded: u64,
    pub fetch_p99_ms: Option<u64>,
}

#[derive(Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    #[serde(flatten)]
    pub stats: HandicapperAggregate,
}

#[derive(Serialize)]
pub struct LeaderboardResponse {
    pub contest_id: String,
    pub window: TimeWindow,
    pub computed_at: DateTime<Utc>,
    pub rows: Vec<LeaderboardRow>,
    pub skipped: SkipStats,
}

#[derive(Serialize)]
pub struct RefreshAccepted {
    pub contest_id: String,
    pub status: &'static str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        contests: state.store.contest_count(),
        last_refresh_at_ns: state.health.last_refresh_at_ns(),
        feed_failures: state.health.feed_failures(),
        stale_discarded: state.health.stale_discarded(),
        fetch_p99_ms: state.latency.snapshot().p99_ms,
    })
}

async fn get_contests(State(state): State<ApiState>) -> Json<Vec<ContestSummary>> {
    Json(state.store.summaries(Utc::now()))
}

async fn get_contest(
    State(state): State<ApiState>,
    Path(contest_id): Path<String>,
) -> Result<Json<ContestSummary>, AppError> {
    state
        .store
        .summary(&contest_id, Utc::now())
        .map(Json)
        .ok_or(AppError::UnknownContest(contest_id))
}

async fn get_leaderboard(
    State(state): State<ApiState>,
    Path(contest_id): Path<String>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let window = match params.window.as_deref() {
        Some(w) => w.parse::<TimeWindow>().map_err(AppError::BadRequest)?,
        None => state.default_window,
    };

    let board = state
        .store
        .leaderboard(&contest_id, window, Utc::now())
        .ok_or_else(|| AppError::UnknownContest(contest_id.clone()))?;

    let rows = board
        .entries
        .into_iter()
        .enumerate()
        .map(|(i, stats)| LeaderboardRow { rank: i + 1, stats })
        .collect();

    Ok(Json(LeaderboardResponse {
        contest_id,
        window: board.window,
        computed_at: board.computed_at,
        rows,
        skipped: board.skipped,
    }))
}

/// Schedule an out-of-band feed fetch. Overlaps with the periodic refresher
/// are resolved by the store's fetch tickets.
async fn post_refresh(
    State(state): State<ApiState>,
    Path(contest_id): Path<String>,
) -> Result<(StatusCode, Json<RefreshAccepted>), AppError> {
    if !state.store.contains(&contest_id) {
        return Err(AppError::UnknownContest(contest_id));
    }

    let ctx = state.refresh.clone();
    let id = contest_id.clone();
    tokio::spawn(async move {
        if let Err(e) = refresh_contest(&ctx, &id).await {
            error!(contest = %id, "Manual refresh failed: {e}");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(RefreshAccepted { contest_id, status: "refresh scheduled" }),
    ))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySnapshot> {
    Json(state.latency.snapshot())
}
