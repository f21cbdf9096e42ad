//! Handicapper leaderboard: ranks pick'em contest participants by simulated
//! betting performance computed from a feed of individual bet records.
//!
//! The pipeline lives in [`leaderboard`]: records are filtered to a time
//! window, folded into one aggregate per handicapper, then ranked by
//! potential winnings on a $100 stake per winning pick.

pub mod api;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod leaderboard;
pub mod refresher;
pub mod state;
pub mod types;
