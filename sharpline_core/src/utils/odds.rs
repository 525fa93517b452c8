//! Odds and line conversion helpers.
//!
//! All probability math happens in f64; conversion to and from American
//! odds happens only at API boundaries, and rounding is explicit.

/// Implied win probability of a single American moneyline, vig included.
#[inline]
pub fn moneyline_implied_prob(odds: i32) -> f64 {
    let o = odds as f64;
    if odds < 0 {
        -o / (-o + 100.0)
    } else {
        100.0 / (o + 100.0)
    }
}

/// Convert a win probability back to the nearest American moneyline.
#[inline]
pub fn prob_to_moneyline(prob: f64) -> i32 {
    let p = prob.clamp(1e-6, 1.0 - 1e-6);
    if p >= 0.5 {
        (-(p / (1.0 - p)) * 100.0).round() as i32
    } else {
        (((1.0 - p) / p) * 100.0).round() as i32
    }
}

/// Remove the vig from a two-sided moneyline by normalizing the implied
/// probabilities to sum to 1. Returns (home, away).
#[inline]
pub fn no_vig_probs(home_odds: i32, away_odds: i32) -> (f64, f64) {
    let home = moneyline_implied_prob(home_odds);
    let away = moneyline_implied_prob(away_odds);
    let overround = home + away;
    if overround <= 0.0 {
        return (0.5, 0.5);
    }
    (home / overround, away / overround)
}

/// Round a line to the nearest half point, the grid books quote on.
#[inline]
pub fn round_to_half(line: f64) -> f64 {
    (line * 2.0).round() / 2.0
}
