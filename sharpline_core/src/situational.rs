//! Situational and weather adjustments.
//!
//! This module provides:
//! - Schedule/travel/emotional factors (rest, short week, bye, time
//!   zones, divisional/rivalry) as signed home-margin deltas
//! - Weather factors (wind, cold, precipitation) as total deductions
//!   with smaller spread effects
//! - Optional per-quarterback weather overlays
//!
//! Every applied factor is emitted as a labeled term so projections can
//! be audited term by term. A factor key is applied at most once per
//! matchup. A dome/indoor flag suppresses all weather adjustments,
//! overlays included, regardless of the forecast supplied.

use crate::config::EngineConfig;
use crate::models::{AdjustmentTerm, MatchupContext, Precipitation, WeatherObservation};
use std::sync::Arc;

/// Accumulated adjustments for one matchup, in home-margin space
/// (positive spread delta helps the home side).
#[derive(Debug, Clone, Default)]
pub struct Adjustments {
    pub terms: Vec<AdjustmentTerm>,
}

impl Adjustments {
    pub fn spread_delta(&self) -> f64 {
        self.terms.iter().map(|t| t.spread_delta).sum()
    }

    pub fn total_delta(&self) -> f64 {
        self.terms.iter().map(|t| t.total_delta).sum()
    }

    fn push(&mut self, term: AdjustmentTerm) {
        debug_assert!(
            self.terms.iter().all(|t| t.label != term.label),
            "factor {} applied twice",
            term.label
        );
        self.terms.push(term);
    }
}

pub struct SituationalAdjustmentModel {
    config: Arc<EngineConfig>,
}

impl SituationalAdjustmentModel {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    /// Compute all applicable adjustments for a matchup.
    ///
    /// `home_is_favorite` orients the factors that point at the
    /// underdog or favorite (divisional bonus, wind spread effect); the
    /// caller derives it from the rating differential plus home field.
    pub fn adjust(&self, context: &MatchupContext, home_is_favorite: bool) -> Adjustments {
        let mut adjustments = Adjustments::default();
        self.schedule_factors(context, home_is_favorite, &mut adjustments);
        if let Some(weather) = &context.weather {
            if !weather.is_dome {
                self.weather_factors(context, weather, home_is_favorite, &mut adjustments);
            }
        }
        adjustments
    }

    fn schedule_factors(
        &self,
        context: &MatchupContext,
        home_is_favorite: bool,
        out: &mut Adjustments,
    ) {
        let cfg = &self.config.situational;

        if context.home_schedule.short_week {
            out.push(AdjustmentTerm::spread("home_short_week", -cfg.short_week));
        }
        if context.away_schedule.short_week {
            out.push(AdjustmentTerm::spread("away_short_week", cfg.short_week));
        }

        if context.home_schedule.off_bye {
            out.push(AdjustmentTerm::spread("home_off_bye", cfg.off_bye));
        }
        if context.away_schedule.off_bye {
            out.push(AdjustmentTerm::spread("away_off_bye", -cfg.off_bye));
        }

        let rest_diff =
            context.home_schedule.rest_days as f64 - context.away_schedule.rest_days as f64;
        if rest_diff != 0.0 {
            let delta =
                (rest_diff * cfg.rest_day_step).clamp(-cfg.rest_day_cap, cfg.rest_day_cap);
            out.push(AdjustmentTerm::spread("rest_differential", delta));
        }

        if context.away_schedule.timezones_crossed > 0 {
            let delta = context.away_schedule.timezones_crossed as f64 * cfg.timezone_step;
            out.push(AdjustmentTerm::spread("away_travel", delta));
        }
        if context.home_schedule.timezones_crossed > 0 {
            let delta = context.home_schedule.timezones_crossed as f64 * cfg.timezone_step;
            out.push(AdjustmentTerm::spread("home_travel", -delta));
        }

        // Emotional factors lean toward the underdog.
        let underdog_sign = if home_is_favorite { -1.0 } else { 1.0 };
        if context.divisional {
            out.push(AdjustmentTerm::spread(
                "divisional_underdog",
                underdog_sign * cfg.divisional_underdog,
            ));
        }
        if context.rivalry {
            out.push(AdjustmentTerm::spread(
                "rivalry_underdog",
                underdog_sign * cfg.rivalry_underdog,
            ));
        }
    }

    fn weather_factors(
        &self,
        context: &MatchupContext,
        weather: &WeatherObservation,
        home_is_favorite: bool,
        out: &mut Adjustments,
    ) {
        let cfg = &self.config.weather;
        let favorite_sign = if home_is_favorite { 1.0 } else { -1.0 };

        for rule in &cfg.wind {
            if weather.wind_mph >= rule.threshold {
                out.push(AdjustmentTerm {
                    label: rule.label.clone(),
                    spread_delta: favorite_sign * rule.spread_delta,
                    total_delta: rule.total_delta,
                });
            }
        }

        for rule in &cfg.cold {
            if weather.temperature_f <= rule.threshold {
                out.push(AdjustmentTerm {
                    label: rule.label.clone(),
                    spread_delta: favorite_sign * rule.spread_delta,
                    total_delta: rule.total_delta,
                });
            }
        }

        if weather.precipitation_chance >= cfg.precipitation.threshold {
            out.push(AdjustmentTerm {
                label: cfg.precipitation.label.clone(),
                spread_delta: favorite_sign * cfg.precipitation.spread_delta,
                total_delta: cfg.precipitation.total_delta,
            });
        }
        if weather.precipitation == Precipitation::Snow {
            out.push(AdjustmentTerm {
                label: cfg.snow.label.clone(),
                spread_delta: favorite_sign * cfg.snow.spread_delta,
                total_delta: cfg.snow.total_delta,
            });
        }

        self.qb_overlays(context, weather, out);
    }

    /// Per-player weather bias, applied only when the starter is known
    /// and has a configured modifier. Absence of data yields zero
    /// modifier, never an error.
    fn qb_overlays(
        &self,
        context: &MatchupContext,
        weather: &WeatherObservation,
        out: &mut Adjustments,
    ) {
        let cfg = &self.config.weather;
        let cold = weather.temperature_f <= cfg.qb_cold_at;
        let hot = weather.temperature_f >= cfg.qb_heat_at;
        if !cold && !hot {
            return;
        }

        let lookup = |player: &Option<String>| {
            player.as_deref().and_then(|name| {
                cfg.qb_modifiers
                    .iter()
                    .find(|m| m.player.eq_ignore_ascii_case(name))
            })
        };

        if let Some(modifier) = lookup(&context.home_qb) {
            let delta = if cold { modifier.cold_delta } else { modifier.heat_delta };
            if delta != 0.0 {
                out.push(AdjustmentTerm::spread("home_qb_weather", delta));
            }
        }
        if let Some(modifier) = lookup(&context.away_qb) {
            let delta = if cold { modifier.cold_delta } else { modifier.heat_delta };
            if delta != 0.0 {
                out.push(AdjustmentTerm::spread("away_qb_weather", -delta));
            }
        }
    }
}
