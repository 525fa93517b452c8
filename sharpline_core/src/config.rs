//! Engine configuration.
//!
//! This module provides:
//! - Per-league parameters (home field, baseline total, rating bounds)
//! - Injury tables (type parameters, status fallbacks, position values)
//! - Situational and weather factor values
//! - Edge tier bands, Kelly fractions and key numbers
//!
//! Every point value, capacity fraction, recovery window, tier boundary
//! and weather threshold lives here so the model can be recalibrated per
//! season without touching calculation code. One immutable `EngineConfig`
//! is injected into each component at construction.

use crate::error::EngineError;
use crate::models::{ConfidenceTier, InjuryStatus, League};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// League Parameters
// ============================================================================

/// Fixed per-league model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueParams {
    pub league: League,
    /// Home-field advantage in points.
    pub home_field: f64,
    /// League-average total used as the projection baseline.
    pub baseline_total: f64,
    /// Valid range for seeded/derived ratings.
    pub rating_floor: f64,
    pub rating_ceiling: f64,
    /// Divisor converting a projected margin into win-probability
    /// log-odds: `p(home) = logistic(margin / spread_prob_scale)`.
    pub spread_prob_scale: f64,
    /// Plausibility bounds for ingested market lines. Values outside
    /// are rejected at ingestion, never clamped.
    pub max_spread: f64,
    pub min_total: f64,
    pub max_total: f64,
}

fn default_league_params() -> Vec<LeagueParams> {
    vec![
        LeagueParams {
            league: League::NFL,
            home_field: 2.0,
            baseline_total: 44.5,
            rating_floor: 0.0,
            rating_ceiling: 40.0,
            spread_prob_scale: 7.0,
            max_spread: 30.0,
            min_total: 20.0,
            max_total: 80.0,
        },
        LeagueParams {
            league: League::NCAAF,
            home_field: 2.5,
            baseline_total: 52.0,
            rating_floor: 0.0,
            rating_ceiling: 105.0,
            spread_prob_scale: 8.5,
            max_spread: 60.0,
            min_total: 25.0,
            max_total: 100.0,
        },
        LeagueParams {
            league: League::NBA,
            home_field: 2.8,
            baseline_total: 224.0,
            rating_floor: 0.0,
            rating_ceiling: 40.0,
            spread_prob_scale: 6.5,
            max_spread: 25.0,
            min_total: 170.0,
            max_total: 280.0,
        },
        LeagueParams {
            league: League::NCAAB,
            home_field: 3.5,
            baseline_total: 145.0,
            rating_floor: 0.0,
            rating_ceiling: 105.0,
            spread_prob_scale: 7.0,
            max_spread: 45.0,
            min_total: 100.0,
            max_total: 200.0,
        },
    ]
}

// ============================================================================
// Rating Recurrence
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingConfig {
    /// Weight on the prior week's rating. The balance goes to the
    /// observed true game performance (the documented 90/10 split).
    pub prior_weight: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self { prior_weight: 0.90 }
    }
}

// ============================================================================
// Injury Model
// ============================================================================

/// Recovery parameters for one recognized injury type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryTypeParams {
    pub name: String,
    /// Keywords matched (whole-word, then fuzzy) against the free-text
    /// injury description.
    pub keywords: Vec<String>,
    /// Fraction of the player's value remaining on day 0.
    pub immediate_capacity: f64,
    /// Days until capacity interpolates back to 1.0.
    pub recovery_days: u32,
}

/// Capacity used when no injury type can be extracted from the
/// description. Status-only capacities do not decay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCapacity {
    pub status: InjuryStatus,
    pub capacity: f64,
}

/// Base point value for one roster position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionValue {
    pub position: String,
    pub points: f64,
}

/// Non-overlapping severity thresholds over a team's summed point
/// impact: minor < moderate_at <= moderate < major_at <= major <
/// critical_at <= critical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub moderate_at: f64,
    pub major_at: f64,
    pub critical_at: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryConfig {
    pub types: Vec<InjuryTypeParams>,
    pub status_capacities: Vec<StatusCapacity>,
    pub position_values: Vec<PositionValue>,
    /// Base value for positions not in the table (league average).
    pub default_position_value: f64,
    pub severity: SeverityThresholds,
    /// Jaro-Winkler score required for a fuzzy keyword match.
    pub fuzzy_match_threshold: f64,
}

impl Default for InjuryConfig {
    fn default() -> Self {
        let injury_type = |name: &str, keywords: &[&str], immediate: f64, days: u32| {
            InjuryTypeParams {
                name: name.to_string(),
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
                immediate_capacity: immediate,
                recovery_days: days,
            }
        };

        Self {
            types: vec![
                injury_type("concussion", &["concussion", "head"], 0.0, 10),
                injury_type("hamstring", &["hamstring"], 0.55, 21),
                injury_type("ankle", &["ankle"], 0.70, 14),
                injury_type("knee", &["knee", "mcl", "meniscus"], 0.50, 28),
                injury_type("acl", &["acl", "torn acl"], 0.0, 270),
                injury_type("achilles", &["achilles"], 0.0, 300),
                injury_type("shoulder", &["shoulder", "labrum"], 0.75, 14),
                injury_type("groin", &["groin"], 0.65, 18),
                injury_type("back", &["back", "spine"], 0.60, 21),
                injury_type("ribs", &["rib", "ribs"], 0.70, 14),
                injury_type("illness", &["illness", "flu"], 0.80, 4),
            ],
            status_capacities: vec![
                StatusCapacity {
                    status: InjuryStatus::Active,
                    capacity: 1.0,
                },
                StatusCapacity {
                    status: InjuryStatus::Questionable,
                    capacity: 0.92,
                },
                StatusCapacity {
                    status: InjuryStatus::Doubtful,
                    capacity: 0.35,
                },
                StatusCapacity {
                    status: InjuryStatus::Out,
                    capacity: 0.0,
                },
                StatusCapacity {
                    status: InjuryStatus::InjuredReserve,
                    capacity: 0.0,
                },
            ],
            position_values: vec![
                PositionValue {
                    position: "QB".to_string(),
                    points: 7.0,
                },
                PositionValue {
                    position: "RB".to_string(),
                    points: 1.5,
                },
                PositionValue {
                    position: "WR".to_string(),
                    points: 1.5,
                },
                PositionValue {
                    position: "TE".to_string(),
                    points: 1.0,
                },
                PositionValue {
                    position: "OL".to_string(),
                    points: 1.0,
                },
                PositionValue {
                    position: "DL".to_string(),
                    points: 1.0,
                },
                PositionValue {
                    position: "LB".to_string(),
                    points: 1.0,
                },
                PositionValue {
                    position: "DB".to_string(),
                    points: 1.25,
                },
                PositionValue {
                    position: "K".to_string(),
                    points: 0.5,
                },
                PositionValue {
                    position: "P".to_string(),
                    points: 0.25,
                },
            ],
            default_position_value: 1.0,
            severity: SeverityThresholds {
                moderate_at: 2.0,
                major_at: 4.0,
                critical_at: 7.0,
            },
            fuzzy_match_threshold: 0.88,
        }
    }
}

// ============================================================================
// Situational & Weather Factors
// ============================================================================

/// Schedule/travel/emotional factor values, in home-margin points
/// (positive helps the side the factor favors).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SituationalConfig {
    /// Penalty for the side playing on a short week.
    pub short_week: f64,
    /// Bonus for the side coming off a bye.
    pub off_bye: f64,
    /// Points per day of rest differential.
    pub rest_day_step: f64,
    /// Cap on the accumulated rest differential.
    pub rest_day_cap: f64,
    /// Penalty per time zone crossed by the travelling side.
    pub timezone_step: f64,
    /// Bonus toward the underdog in divisional matchups.
    pub divisional_underdog: f64,
    /// Bonus toward the underdog in rivalry games.
    pub rivalry_underdog: f64,
}

impl Default for SituationalConfig {
    fn default() -> Self {
        Self {
            short_week: 1.5,
            off_bye: 1.0,
            rest_day_step: 0.3,
            rest_day_cap: 1.5,
            timezone_step: 0.4,
            divisional_underdog: 1.0,
            rivalry_underdog: 0.5,
        }
    }
}

/// One weather threshold rule. Rules whose threshold is met contribute
/// their deltas; multiple rules for the same input stack (e.g. wind 15
/// and wind 20 both fire in a 25 mph forecast).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherRule {
    pub label: String,
    pub threshold: f64,
    pub total_delta: f64,
    /// Home-margin delta; conventionally small relative to the total
    /// effect.
    pub spread_delta: f64,
}

/// Per-quarterback weather bias overlay. Applied only when the starter
/// is known and listed; absence of data yields zero modifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QbWeatherModifier {
    pub player: String,
    /// Margin delta toward the player's side in qualifying cold games.
    pub cold_delta: f64,
    /// Margin delta toward the player's side in qualifying hot games.
    pub heat_delta: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Wind rules fire when wind_mph >= threshold.
    pub wind: Vec<WeatherRule>,
    /// Cold rules fire when temperature_f <= threshold.
    pub cold: Vec<WeatherRule>,
    /// Precipitation-chance rule fires when chance >= threshold (0-1).
    pub precipitation: WeatherRule,
    /// Additional rule applied when the precipitation type is snow.
    pub snow: WeatherRule,
    /// Temperature at or below which QB cold modifiers apply.
    pub qb_cold_at: f64,
    /// Temperature at or above which QB heat modifiers apply.
    pub qb_heat_at: f64,
    pub qb_modifiers: Vec<QbWeatherModifier>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            wind: vec![
                WeatherRule {
                    label: "wind_15mph".to_string(),
                    threshold: 15.0,
                    total_delta: -2.5,
                    spread_delta: 0.5,
                },
                WeatherRule {
                    label: "wind_20mph".to_string(),
                    threshold: 20.0,
                    total_delta: -2.0,
                    spread_delta: 0.0,
                },
            ],
            cold: vec![
                WeatherRule {
                    label: "cold_20f".to_string(),
                    threshold: 20.0,
                    total_delta: -1.5,
                    spread_delta: 0.0,
                },
                WeatherRule {
                    label: "cold_10f".to_string(),
                    threshold: 10.0,
                    total_delta: -1.0,
                    spread_delta: 0.0,
                },
            ],
            precipitation: WeatherRule {
                label: "precipitation".to_string(),
                threshold: 0.60,
                total_delta: -1.0,
                spread_delta: 0.0,
            },
            snow: WeatherRule {
                label: "snow".to_string(),
                threshold: 0.0,
                total_delta: -2.0,
                spread_delta: -0.5,
            },
            qb_cold_at: 25.0,
            qb_heat_at: 90.0,
            qb_modifiers: Vec::new(),
        }
    }
}

// ============================================================================
// Edge Tiers & Key Numbers
// ============================================================================

/// One confidence band over `abs(edge)`. Bands are ascending by
/// `min_edge`; classification picks the highest band whose `min_edge`
/// is not above the observed edge, so a list whose first band starts at
/// 0.0 partitions the line with no gaps or overlaps by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierBand {
    pub min_edge: f64,
    pub tier: ConfidenceTier,
    pub kelly_fraction: f64,
    /// Historical win rate shown with recommendations. Display only.
    pub win_rate_label: String,
}

fn default_spread_bands() -> Vec<TierBand> {
    vec![
        TierBand {
            min_edge: 0.0,
            tier: ConfidenceTier::NoPlay,
            kelly_fraction: 0.0,
            win_rate_label: "-".to_string(),
        },
        TierBand {
            min_edge: 1.0,
            tier: ConfidenceTier::Lean,
            kelly_fraction: 0.01,
            win_rate_label: "53%".to_string(),
        },
        TierBand {
            min_edge: 2.0,
            tier: ConfidenceTier::Moderate,
            kelly_fraction: 0.02,
            win_rate_label: "55%".to_string(),
        },
        TierBand {
            min_edge: 4.0,
            tier: ConfidenceTier::Strong,
            kelly_fraction: 0.03,
            win_rate_label: "58%".to_string(),
        },
        TierBand {
            min_edge: 7.0,
            tier: ConfidenceTier::Prime,
            kelly_fraction: 0.05,
            win_rate_label: "62%".to_string(),
        },
    ]
}

/// Moneyline bands are over the probability-point edge (model win
/// probability minus market implied probability), not line points.
fn default_moneyline_bands() -> Vec<TierBand> {
    vec![
        TierBand {
            min_edge: 0.0,
            tier: ConfidenceTier::NoPlay,
            kelly_fraction: 0.0,
            win_rate_label: "-".to_string(),
        },
        TierBand {
            min_edge: 0.03,
            tier: ConfidenceTier::Lean,
            kelly_fraction: 0.01,
            win_rate_label: "53%".to_string(),
        },
        TierBand {
            min_edge: 0.05,
            tier: ConfidenceTier::Moderate,
            kelly_fraction: 0.02,
            win_rate_label: "55%".to_string(),
        },
        TierBand {
            min_edge: 0.08,
            tier: ConfidenceTier::Strong,
            kelly_fraction: 0.03,
            win_rate_label: "58%".to_string(),
        },
        TierBand {
            min_edge: 0.12,
            tier: ConfidenceTier::Prime,
            kelly_fraction: 0.05,
            win_rate_label: "62%".to_string(),
        },
    ]
}

/// Statistically significant final-margin values. A market spread on or
/// adjacent to one adjusts the stake, never the tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyNumberConfig {
    pub numbers: Vec<f64>,
    /// How close (in points) a line must sit to a key number to count.
    pub tolerance: f64,
    /// Stake multiplier when the projection pushes across the key
    /// number in the bettor's favor.
    pub cross_multiplier: f64,
    /// Stake multiplier when the key number sits between market and
    /// projection working against the bettor.
    pub blocked_multiplier: f64,
}

impl Default for KeyNumberConfig {
    fn default() -> Self {
        Self {
            numbers: vec![3.0, 7.0],
            tolerance: 0.5,
            cross_multiplier: 1.25,
            blocked_multiplier: 0.75,
        }
    }
}

// ============================================================================
// Engine Config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub leagues: Vec<LeagueParams>,
    pub ratings: RatingConfig,
    pub injury: InjuryConfig,
    pub situational: SituationalConfig,
    pub weather: WeatherConfig,
    pub spread_bands: Vec<TierBand>,
    pub total_bands: Vec<TierBand>,
    pub moneyline_bands: Vec<TierBand>,
    pub key_numbers: KeyNumberConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            leagues: default_league_params(),
            ratings: RatingConfig::default(),
            injury: InjuryConfig::default(),
            situational: SituationalConfig::default(),
            weather: WeatherConfig::default(),
            spread_bands: default_spread_bands(),
            total_bands: default_spread_bands(),
            moneyline_bands: default_moneyline_bands(),
            key_numbers: KeyNumberConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a configuration document. A config file
    /// states the full calibration; omitted sections are an error.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("failed to parse engine config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Parameters for a league, if configured.
    pub fn league(&self, league: League) -> crate::error::Result<&LeagueParams> {
        self.leagues
            .iter()
            .find(|p| p.league == league)
            .ok_or(EngineError::UnknownLeague(league.as_str()))
    }

    /// Base point value for a raw position string (case-insensitive).
    /// Unknown positions fall back to the league-average default.
    pub fn position_value(&self, position: &str) -> Option<f64> {
        self.injury
            .position_values
            .iter()
            .find(|p| p.position.eq_ignore_ascii_case(position))
            .map(|p| p.points)
    }

    /// Status-only fallback capacity. Every status has an entry in the
    /// default table; a config that drops one fails validation.
    pub fn status_capacity(&self, status: InjuryStatus) -> f64 {
        self.injury
            .status_capacities
            .iter()
            .find(|s| s.status == status)
            .map(|s| s.capacity)
            .unwrap_or(0.0)
    }

    /// Structural checks that keep the calculation code free of
    /// defensive re-validation.
    pub fn validate(&self) -> Result<()> {
        validate_bands("spread_bands", &self.spread_bands)?;
        validate_bands("total_bands", &self.total_bands)?;
        validate_bands("moneyline_bands", &self.moneyline_bands)?;

        let w = self.ratings.prior_weight;
        if !(0.0..=1.0).contains(&w) {
            return Err(EngineError::InvalidConfig(format!(
                "ratings.prior_weight must be in [0, 1], got {w}"
            ))
            .into());
        }

        let sev = &self.injury.severity;
        if !(sev.moderate_at < sev.major_at && sev.major_at < sev.critical_at) {
            return Err(EngineError::InvalidConfig(
                "injury.severity thresholds must be strictly increasing".to_string(),
            )
            .into());
        }

        for t in &self.injury.types {
            if !(0.0..=1.0).contains(&t.immediate_capacity) {
                return Err(EngineError::InvalidConfig(format!(
                    "injury type {} immediate_capacity must be in [0, 1]",
                    t.name
                ))
                .into());
            }
        }
        for s in &self.injury.status_capacities {
            if !(0.0..=1.0).contains(&s.capacity) {
                return Err(EngineError::InvalidConfig(format!(
                    "status capacity for {} must be in [0, 1]",
                    s.status.as_str()
                ))
                .into());
            }
        }
        for required in [
            InjuryStatus::Active,
            InjuryStatus::Questionable,
            InjuryStatus::Doubtful,
            InjuryStatus::Out,
            InjuryStatus::InjuredReserve,
        ] {
            if !self
                .injury
                .status_capacities
                .iter()
                .any(|s| s.status == required)
            {
                return Err(EngineError::InvalidConfig(format!(
                    "missing status capacity for {}",
                    required.as_str()
                ))
                .into());
            }
        }

        if self.key_numbers.tolerance < 0.0 {
            return Err(
                EngineError::InvalidConfig("key_numbers.tolerance must be >= 0".to_string()).into(),
            );
        }

        for params in &self.leagues {
            if params.rating_floor >= params.rating_ceiling {
                return Err(EngineError::InvalidConfig(format!(
                    "league {} rating bounds are inverted",
                    params.league.as_str()
                ))
                .into());
            }
            if params.spread_prob_scale <= 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "league {} spread_prob_scale must be positive",
                    params.league.as_str()
                ))
                .into());
            }
            if params.min_total >= params.max_total || params.max_spread <= 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "league {} line plausibility bounds are inverted",
                    params.league.as_str()
                ))
                .into());
            }
        }

        Ok(())
    }
}

fn validate_bands(name: &str, bands: &[TierBand]) -> Result<()> {
    if bands.is_empty() {
        return Err(EngineError::InvalidConfig(format!("{name} must not be empty")).into());
    }
    if bands[0].min_edge != 0.0 {
        return Err(EngineError::InvalidConfig(format!(
            "{name} must start at min_edge 0.0 so every edge classifies"
        ))
        .into());
    }
    for pair in bands.windows(2) {
        if pair[1].min_edge <= pair[0].min_edge {
            return Err(EngineError::InvalidConfig(format!(
                "{name} boundaries must be strictly increasing"
            ))
            .into());
        }
    }
    for band in bands {
        if band.kelly_fraction < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "{name} kelly fractions must be non-negative"
            ))
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_league_lookup() {
        let config = EngineConfig::default();
        let nfl = config.league(League::NFL).unwrap();
        assert_eq!(nfl.home_field, 2.0);
        assert_eq!(nfl.baseline_total, 44.5);
    }

    #[test]
    fn test_position_lookup_case_insensitive() {
        let config = EngineConfig::default();
        assert_eq!(config.position_value("qb"), Some(7.0));
        assert_eq!(config.position_value("QB"), Some(7.0));
        assert_eq!(config.position_value("EDGE"), None);
    }

    #[test]
    fn test_bands_must_start_at_zero() {
        let mut config = EngineConfig::default();
        config.spread_bands[0].min_edge = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bands_must_be_increasing() {
        let mut config = EngineConfig::default();
        config.spread_bands[2].min_edge = 0.5; // below the Lean band
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_severity_thresholds_must_increase() {
        let mut config = EngineConfig::default();
        config.injury.severity.major_at = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_status_capacity_rejected() {
        let mut config = EngineConfig::default();
        config
            .injury
            .status_capacities
            .retain(|s| s.status != InjuryStatus::Doubtful);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = EngineConfig::from_json(&json).unwrap();
        assert_eq!(parsed.leagues.len(), config.leagues.len());
        assert_eq!(parsed.spread_bands.len(), config.spread_bands.len());
    }
}
