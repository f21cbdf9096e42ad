use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use handicapper_leaderboard::api::health::HealthState;
use handicapper_leaderboard::api::latency::LatencyStats;
use handicapper_leaderboard::api::routes::{router, ApiState};
use handicapper_leaderboard::config::Config;
use handicapper_leaderboard::error::Result;
use handicapper_leaderboard::fetcher::build_client;
use handicapper_leaderboard::refresher::{refresh_contest, FeedRefresher, RefreshContext};
use handicapper_leaderboard::state::ContestStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Contest registry ---
    let store = ContestStore::new();
    let now = Utc::now();
    for contest in &cfg.contests {
        store.register(contest.clone(), cfg.default_window, now);
        info!(
            contest = %contest.id,
            name = %contest.contest_name,
            sponsored = contest.sponsored,
            "Registered contest {} ({})",
            contest.contest_name,
            contest.spreadsheet_url,
        );
    }

    let health = Arc::new(HealthState::new());
    let latency = Arc::new(LatencyStats::new());
    let ctx = RefreshContext {
        client: build_client(Duration::from_secs(cfg.feed_timeout_secs))?,
        store: Arc::clone(&store),
        health: Arc::clone(&health),
        latency: Arc::clone(&latency),
    };

    // --- Bootstrap: first fetch for every contest, concurrently ---
    let ids = store.contest_ids();
    let results = join_all(ids.iter().map(|id| refresh_contest(&ctx, id))).await;
    for (id, result) in ids.iter().zip(results) {
        match result {
            Ok(outcome) => {
                let summary = store.summary(id, Utc::now());
                info!(
                    contest = %id,
                    ?outcome,
                    handicappers = summary.as_ref().map_or(0, |s| s.handicappers),
                    "Bootstrap fetch complete"
                );
            }
            Err(e) => warn!(contest = %id, "Bootstrap fetch failed: {e}"),
        }
    }

    // --- Periodic refreshers ---
    for id in ids {
        let refresher = FeedRefresher::new(ctx.clone(), id, cfg.feed_refresh_interval_secs);
        tokio::spawn(async move { refresher.run().await });
    }
    info!(
        interval_secs = cfg.feed_refresh_interval_secs,
        "Feed refreshers started for {} contests",
        store.contest_count(),
    );

    // --- HTTP API server ---
    let api_state = ApiState {
        store,
        refresh: ctx,
        health,
        latency,
        default_window: cfg.default_window,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
