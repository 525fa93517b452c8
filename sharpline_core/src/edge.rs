//! Edge detection against posted market lines.
//!
//! This module provides:
//! - Signed edge calculation per market (spread, total, moneyline)
//! - Ordered, non-overlapping confidence tier bands with fixed Kelly
//!   fractions and display-only win-rate labels
//! - Key-number proximity handling as a separate, labeled stake
//!   adjustment (never folded into tier selection)
//! - `EdgeHistory`: append-only record of every detection run
//!
//! Spread convention is the book's: negative = home favored. A negative
//! spread edge therefore means the model makes the home side stronger
//! than the market does (value on home); a positive edge favors away.

use crate::config::{EngineConfig, TierBand};
use crate::error::{EngineError, Result};
use crate::models::{EdgeResult, GameProjection, KeyNumberAdjustment, MarketKind, MarketLine};
use crate::utils::odds::{moneyline_implied_prob, no_vig_probs, round_to_half};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

/// Pick the band for an absolute edge. Bands are ascending and start
/// at 0.0 (validated at config load), so exactly one band applies to
/// any non-negative edge.
fn classify<'a>(bands: &'a [TierBand], abs_edge: f64) -> &'a TierBand {
    bands
        .iter()
        .rev()
        .find(|b| abs_edge >= b.min_edge)
        .unwrap_or(&bands[0])
}

pub struct EdgeDetector {
    config: Arc<EngineConfig>,
}

impl EdgeDetector {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    /// Detect edges for every market present in the snapshot. A
    /// snapshot carrying no line at all is a hard error: an edge
    /// cannot be detected without both sides of the comparison.
    pub fn detect_all(
        &self,
        projection: &GameProjection,
        market: &MarketLine,
        now: DateTime<Utc>,
    ) -> Result<Vec<EdgeResult>> {
        let mut results = Vec::new();
        if market.spread.is_some() {
            results.push(self.detect_spread(projection, market, now)?);
        }
        if market.total.is_some() {
            results.push(self.detect_total(projection, market, now)?);
        }
        if market.moneyline_home.is_some() {
            results.push(self.detect_moneyline(projection, market, now)?);
        }
        if results.is_empty() {
            return Err(EngineError::MissingInput {
                game_id: market.game_id.clone(),
                what: "market line",
            });
        }
        Ok(results)
    }

    /// Spread edge: projected quoted spread minus market spread.
    pub fn detect_spread(
        &self,
        projection: &GameProjection,
        market: &MarketLine,
        now: DateTime<Utc>,
    ) -> Result<EdgeResult> {
        let market_spread = market.spread.ok_or_else(|| EngineError::MissingInput {
            game_id: market.game_id.clone(),
            what: "market spread",
        })?;

        let edge = projection.spread - market_spread;
        let band = classify(&self.config.spread_bands, edge.abs());

        let key_number_adjustment = if band.tier.is_actionable() {
            self.key_number_adjustment(-market_spread, projection.home_margin)
        } else {
            None
        };
        let stake_fraction = band.kelly_fraction
            * key_number_adjustment
                .as_ref()
                .map_or(1.0, |adj| adj.multiplier);

        debug!(
            game_id = %market.game_id,
            edge,
            tier = band.tier.as_str(),
            "spread edge"
        );

        Ok(EdgeResult {
            game_id: market.game_id.clone(),
            league: market.league,
            market: MarketKind::Spread,
            projected: projection.spread,
            market_value: market_spread,
            edge,
            tier: band.tier,
            kelly_fraction: band.kelly_fraction,
            stake_fraction,
            win_rate_label: band.win_rate_label.clone(),
            key_number_adjustment,
            breakdown: projection.breakdown.clone(),
            detected_at: now,
        })
    }

    /// Total edge: projected total minus market total. Positive favors
    /// the over.
    pub fn detect_total(
        &self,
        projection: &GameProjection,
        market: &MarketLine,
        now: DateTime<Utc>,
    ) -> Result<EdgeResult> {
        let market_total = market.total.ok_or_else(|| EngineError::MissingInput {
            game_id: market.game_id.clone(),
            what: "market total",
        })?;

        let edge = projection.total - market_total;
        let band = classify(&self.config.total_bands, edge.abs());

        Ok(EdgeResult {
            game_id: market.game_id.clone(),
            league: market.league,
            market: MarketKind::Total,
            projected: projection.total,
            market_value: market_total,
            edge,
            tier: band.tier,
            kelly_fraction: band.kelly_fraction,
            stake_fraction: band.kelly_fraction,
            win_rate_label: band.win_rate_label.clone(),
            key_number_adjustment: None,
            breakdown: projection.breakdown.clone(),
            detected_at: now,
        })
    }

    /// Moneyline edge in probability points: the model's home win
    /// probability minus the market's implied probability (de-vigged
    /// when both sides are quoted). Positive favors the home side.
    pub fn detect_moneyline(
        &self,
        projection: &GameProjection,
        market: &MarketLine,
        now: DateTime<Utc>,
    ) -> Result<EdgeResult> {
        let home_odds = market
            .moneyline_home
            .ok_or_else(|| EngineError::MissingInput {
                game_id: market.game_id.clone(),
                what: "home moneyline",
            })?;
        let implied_home = match market.moneyline_away {
            Some(away_odds) => no_vig_probs(home_odds, away_odds).0,
            None => moneyline_implied_prob(home_odds),
        };

        let edge = projection.home_win_prob - implied_home;
        let band = classify(&self.config.moneyline_bands, edge.abs());

        Ok(EdgeResult {
            game_id: market.game_id.clone(),
            league: market.league,
            market: MarketKind::Moneyline,
            projected: projection.home_win_prob,
            market_value: implied_home,
            edge,
            tier: band.tier,
            kelly_fraction: band.kelly_fraction,
            stake_fraction: band.kelly_fraction,
            win_rate_label: band.win_rate_label.clone(),
            key_number_adjustment: None,
            breakdown: projection.breakdown.clone(),
            detected_at: now,
        })
    }

    /// Key-number rule, in home-margin space with the market margin
    /// snapped to the half-point grid books quote on:
    ///
    /// - a key margin strictly between market and projection means the
    ///   disagreement spans the most common final margins, and the
    ///   stake is multiplied up;
    /// - a market line sitting on or within tolerance of a key number,
    ///   with the projection requiring the bettor's side to clear it,
    ///   multiplies the stake down.
    ///
    /// The result is recorded as its own labeled adjustment and never
    /// changes the tier.
    fn key_number_adjustment(
        &self,
        market_margin: f64,
        projected_margin: f64,
    ) -> Option<KeyNumberAdjustment> {
        let cfg = &self.config.key_numbers;
        let market_margin = round_to_half(market_margin);
        let (lo, hi) = if market_margin <= projected_margin {
            (market_margin, projected_margin)
        } else {
            (projected_margin, market_margin)
        };

        for &k in &cfg.numbers {
            for key in [k, -k] {
                if key > lo && key < hi {
                    return Some(KeyNumberAdjustment {
                        key_number: k,
                        multiplier: cfg.cross_multiplier,
                        label: format!("crosses_key_{k}"),
                    });
                }
            }
        }

        for &k in &cfg.numbers {
            for key in [k, -k] {
                if (market_margin - key).abs() <= cfg.tolerance {
                    let needs_beyond = (projected_margin > market_margin
                        && market_margin >= key
                        && key > 0.0)
                        || (projected_margin < market_margin
                            && market_margin <= key
                            && key < 0.0);
                    if needs_beyond {
                        return Some(KeyNumberAdjustment {
                            key_number: k,
                            multiplier: cfg.blocked_multiplier,
                            label: format!("laying_past_key_{k}"),
                        });
                    }
                }
            }
        }

        None
    }
}

// ============================================================================
// Edge History
// ============================================================================

/// Append-only record of every edge detection run. A new market
/// snapshot produces a new record; prior records are retained, never
/// overwritten.
#[derive(Debug, Default)]
pub struct EdgeHistory {
    records: FxHashMap<String, Vec<EdgeResult>>,
}

impl EdgeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, result: EdgeResult) {
        self.records
            .entry(result.game_id.clone())
            .or_default()
            .push(result);
    }

    pub fn for_game(&self, game_id: &str) -> &[EdgeResult] {
        self.records
            .get(game_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Latest record per game for a market kind, across all games.
    pub fn latest(&self, market: MarketKind) -> Vec<&EdgeResult> {
        self.records
            .values()
            .filter_map(|runs| runs.iter().rev().find(|r| r.market == market))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
