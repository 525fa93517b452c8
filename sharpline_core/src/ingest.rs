//! Validated intake of external feed records.
//!
//! The engine's rating history is append-only, so a bad input that
//! slips through corrupts every later week derived from it. Numeric
//! inputs outside the configured plausibility bounds are rejected with
//! a validation error, never clamped. Validation is per-record: one bad
//! row is reported and skipped without blocking the rest of the batch.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{GameResult, InjuryRecord, MarketLine, RatingSeed, WeatherObservation};
use std::sync::Arc;

pub struct Validator {
    config: Arc<EngineConfig>,
}

impl Validator {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    pub fn validate_seed(&self, seed: &RatingSeed) -> Result<()> {
        if seed.team.trim().is_empty() {
            return Err(EngineError::InvalidRecord {
                context: "rating seed".to_string(),
                reason: "empty team identifier".to_string(),
            });
        }
        let params = self.config.league(seed.league)?;
        if seed.rating < params.rating_floor || seed.rating > params.rating_ceiling {
            return Err(EngineError::OutOfRange {
                context: format!("rating seed for {}", seed.team),
                field: "rating",
                value: seed.rating,
            });
        }
        Ok(())
    }

    pub fn validate_game_result(&self, result: &GameResult) -> Result<()> {
        if result.home_team == result.away_team {
            return Err(EngineError::InvalidRecord {
                context: format!("game result {}", result.game_id),
                reason: "home and away team are the same".to_string(),
            });
        }
        if result.week == 0 {
            return Err(EngineError::OutOfRange {
                context: format!("game result {}", result.game_id),
                field: "week",
                value: 0.0,
            });
        }
        Ok(())
    }

    pub fn validate_market_line(&self, line: &MarketLine) -> Result<()> {
        let params = self.config.league(line.league)?;
        if let Some(spread) = line.spread {
            if spread.abs() > params.max_spread {
                return Err(EngineError::OutOfRange {
                    context: format!("market line {}", line.game_id),
                    field: "spread",
                    value: spread,
                });
            }
        }
        if let Some(total) = line.total {
            if total < params.min_total || total > params.max_total {
                return Err(EngineError::OutOfRange {
                    context: format!("market line {}", line.game_id),
                    field: "total",
                    value: total,
                });
            }
        }
        for odds in [line.moneyline_home, line.moneyline_away].into_iter().flatten() {
            // American odds are never between -100 and +100.
            if odds.abs() < 100 {
                return Err(EngineError::OutOfRange {
                    context: format!("market line {}", line.game_id),
                    field: "moneyline",
                    value: odds as f64,
                });
            }
        }
        Ok(())
    }

    pub fn validate_weather(&self, observation: &WeatherObservation) -> Result<()> {
        if observation.wind_mph < 0.0 {
            return Err(EngineError::OutOfRange {
                context: format!("weather at {}", observation.venue),
                field: "wind_mph",
                value: observation.wind_mph,
            });
        }
        if !(-60.0..=140.0).contains(&observation.temperature_f) {
            return Err(EngineError::OutOfRange {
                context: format!("weather at {}", observation.venue),
                field: "temperature_f",
                value: observation.temperature_f,
            });
        }
        if !(0.0..=1.0).contains(&observation.precipitation_chance) {
            return Err(EngineError::OutOfRange {
                context: format!("weather at {}", observation.venue),
                field: "precipitation_chance",
                value: observation.precipitation_chance,
            });
        }
        Ok(())
    }

    pub fn validate_injury_record(&self, record: &InjuryRecord) -> Result<()> {
        if record.player.trim().is_empty() || record.team.trim().is_empty() {
            return Err(EngineError::InvalidRecord {
                context: "injury record".to_string(),
                reason: "empty player or team".to_string(),
            });
        }
        Ok(())
    }
}

/// Split a batch into valid records and per-record rejections.
pub fn partition_valid<'a, T>(
    items: &'a [T],
    validate: impl Fn(&T) -> Result<()>,
) -> (Vec<&'a T>, Vec<(usize, EngineError)>) {
    let mut valid = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match validate(item) {
            Ok(()) => valid.push(item),
            Err(err) => rejected.push((index, err)),
        }
    }
    (valid, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{League, Precipitation};
    use chrono::Utc;

    fn validator() -> Validator {
        Validator::new(Arc::new(EngineConfig::default()))
    }

    fn weather(wind: f64) -> WeatherObservation {
        WeatherObservation {
            venue: "Lambeau Field".to_string(),
            game_time: Utc::now(),
            temperature_f: 40.0,
            wind_mph: wind,
            precipitation_chance: 0.2,
            precipitation: Precipitation::None,
            is_dome: false,
        }
    }

    #[test]
    fn test_negative_wind_rejected_not_clamped() {
        let err = validator().validate_weather(&weather(-5.0)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::OutOfRange {
                field: "wind_mph",
                ..
            }
        ));
        assert!(validator().validate_weather(&weather(0.0)).is_ok());
    }

    #[test]
    fn test_implausible_spread_rejected() {
        let line = MarketLine {
            game_id: "g1".to_string(),
            league: League::NFL,
            home_team: "GB".to_string(),
            away_team: "CHI".to_string(),
            spread: Some(-55.0),
            total: None,
            moneyline_home: None,
            moneyline_away: None,
            observed_at: Utc::now(),
            source: "book".to_string(),
        };
        let err = validator().validate_market_line(&line).unwrap_err();
        assert!(matches!(err, EngineError::OutOfRange { field: "spread", .. }));
    }

    #[test]
    fn test_invalid_moneyline_rejected() {
        let line = MarketLine {
            game_id: "g1".to_string(),
            league: League::NFL,
            home_team: "GB".to_string(),
            away_team: "CHI".to_string(),
            spread: Some(-3.0),
            total: None,
            moneyline_home: Some(-50),
            moneyline_away: None,
            observed_at: Utc::now(),
            source: "book".to_string(),
        };
        let err = validator().validate_market_line(&line).unwrap_err();
        assert!(matches!(
            err,
            EngineError::OutOfRange {
                field: "moneyline",
                ..
            }
        ));
    }

    #[test]
    fn test_seed_outside_league_bounds_rejected() {
        let seed = RatingSeed {
            team: "GB".to_string(),
            league: League::NFL,
            rating: 95.0, // NFL ratings top out at 40
            offense: 10.0,
            defense: 10.0,
        };
        assert!(validator().validate_seed(&seed).is_err());
    }

    #[test]
    fn test_partition_reports_each_rejection() {
        let validator = validator();
        let observations = vec![weather(10.0), weather(-1.0), weather(20.0)];
        let (valid, rejected) =
            partition_valid(&observations, |o| validator.validate_weather(o));
        assert_eq!(valid.len(), 2);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0, 1);
    }
}
