//! American odds → simulated payout for a fixed stake.

use crate::config::STAKE;
use crate::error::MalformedRecord;
use crate::types::RawOdds;

/// Largest accepted odds magnitude. Real lines sit far below this; anything
/// larger is a data-entry error.
pub const MAX_ODDS_MAGNITUDE: u64 = 1_000_000;

/// Non-zero American odds. Positive values are underdog prices (profit per
/// $100 staked), negative values are favourite prices (stake per $100 profit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmericanOdds(i64);

impl AmericanOdds {
    pub fn new(value: i64) -> Result<Self, MalformedRecord> {
        if value == 0 {
            return Err(MalformedRecord::ZeroOdds);
        }
        if value.unsigned_abs() > MAX_ODDS_MAGNITUDE {
            return Err(MalformedRecord::OddsOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> i64 {
        self.0
    }

    /// Payout credited for a won bet at `STAKE`.
    pub fn payout_on_win(self) -> f64 {
        payout_on_win(self)
    }
}

/// `O > 0`: `STAKE * (O / 100)`; `O < 0`: `STAKE * (100 / |O|)`.
pub fn payout_on_win(odds: AmericanOdds) -> f64 {
    let o = odds.0 as f64;
    if o > 0.0 {
        STAKE * (o / 100.0)
    } else {
        STAKE * (100.0 / o.abs())
    }
}

/// Parse wire odds into a typed value. Strings may carry whitespace and a
/// leading `+`; floats must be whole numbers.
pub fn parse_odds(raw: &RawOdds) -> Result<AmericanOdds, MalformedRecord> {
    let value = match raw {
        RawOdds::Integer(n) => *n,
        RawOdds::Float(x) => {
            if !x.is_finite() || x.fract() != 0.0 || x.abs() > i64::MAX as f64 {
                return Err(MalformedRecord::UnparseableOdds(raw.to_string()));
            }
            *x as i64
        }
        RawOdds::Text(s) => {
            let t = s.trim();
            let t = t.strip_prefix('+').unwrap_or(t);
            t.parse::<i64>()
                .map_err(|_| MalformedRecord::UnparseableOdds(s.clone()))?
        }
    };
    AmericanOdds::new(value)
}

/// Round to whole cents for presentation.
pub fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
