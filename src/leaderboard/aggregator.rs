use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::error::MalformedRecord;
use crate::leaderboard::odds::parse_odds;
use crate::types::{BetOutcome, BetRecord, HandicapperAggregate};

/// Per-record exclusions counted during one recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipStats {
    pub pending: u32,
    pub malformed_odds: u32,
    pub unknown_result: u32,
    pub unparseable_time: u32,
}

impl SkipStats {
    pub fn malformed(&self) -> u32 {
        self.malformed_odds + self.unknown_result + self.unparseable_time
    }
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub handicappers: HashMap<String, HandicapperAggregate>,
    pub skipped: SkipStats,
}

/// Fold settled bets into one aggregate per username.
///
/// Totals do not depend on input order. `social_type` (last record wins) and
/// the order of `research_tools` (first appearance) do.
pub fn aggregate<'a, I>(bets: I) -> Aggregation
where
    I: IntoIterator<Item = &'a BetRecord>,
{
    let mut out = Aggregation::default();

    for bet in bets {
        let outcome = match bet.outcome() {
            Ok(BetOutcome::Pending) => {
                out.skipped.pending += 1;
                continue;
            }
            Ok(o) => o,
            Err(e) => {
                log_malformed(bet, &e);
                out.skipped.unknown_result += 1;
                continue;
            }
        };

        let username = bet.effective_username();
        let odds = match bet.odds.as_ref().ok_or(MalformedRecord::MissingOdds).and_then(parse_odds) {
            Ok(o) => o,
            Err(e) => {
                log_malformed(bet, &e);
                out.skipped.malformed_odds += 1;
                continue;
            }
        };

        let won = outcome == BetOutcome::Won;
        let (prev_total, prev_won) = out
            .handicappers
            .get(username)
            .map_or((0, 0), |h| (h.total_odds, h.total_won_odds));
        let totals = prev_total.checked_add(odds.value()).zip(if won {
            prev_won.checked_add(odds.value())
        } else {
            Some(prev_won)
        });
        let Some((total_odds, total_won_odds)) = totals else {
            log_malformed(bet, &MalformedRecord::OddsOutOfRange(odds.value()));
            out.skipped.malformed_odds += 1;
            continue;
        };

        let entry = out
            .handicappers
            .entry(username.to_string())
            .or_insert_with(|| HandicapperAggregate::new(username));

        entry.number_of_bets += 1;
        entry.total_odds = total_odds;
        entry.total_won_odds = total_won_odds;

        if won {
            entry.number_of_bets_won += 1;
            entry.potential_wins += odds.payout_on_win();
        }

        if let Some(tool) = bet.research_tool() {
            if !entry.research_tools.iter().any(|t| t == tool) {
                entry.research_tools.push(tool.to_string());
            }
        }

        if bet.social_type.is_some() {
            entry.social_type = bet.social_type.clone();
        }
    }

    for h in out.handicappers.values_mut() {
        h.win_ratio = win_ratio(h.number_of_bets_won, h.number_of_bets);
    }

    out
}

/// Percentage of settled bets won. NaN when nothing is settled, which cannot
/// happen for an aggregate produced by `aggregate`.
pub fn win_ratio(won: u32, total: u32) -> f64 {
    if total == 0 {
        return f64::NAN;
    }
    f64::from(won) / f64::from(total) * 100.0
}

fn log_malformed(bet: &BetRecord, err: &MalformedRecord) {
    debug!(
        user = bet.effective_username(),
        posted_time = ?bet.posted_time,
        "Skipping malformed bet: {err}"
    );
}
