pub mod aggregator;
pub mod engine;
pub mod odds;
pub mod ranker;
pub mod window;

pub use aggregator::{aggregate, Aggregation, SkipStats};
pub use engine::{compute, FeedStatus, FetchTicket, Leaderboard, LeaderboardEngine, LeaderboardState, RefreshOutcome};
pub use odds::{parse_odds, payout_on_win, AmericanOdds};
pub use ranker::rank;
pub use window::{filter_window, parse_posted_time, posted_at};
