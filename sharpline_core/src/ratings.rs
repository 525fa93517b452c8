//! Weekly power-rating recurrence and append-only rating history.
//!
//! This module provides:
//! - The pure week-over-week rating update (90/10 smoothing against
//!   observed true game performance)
//! - Offensive/defensive sub-rating updates against the league baseline
//! - `RatingBook`: append-only per-(team, league) history with strict
//!   in-order week advancement
//!
//! Ratings are computed independently per team per week and are a pure
//! function of the prior week's rating and that week's inputs: given
//! identical inputs the recurrence always reproduces identical ratings.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{GameResult, League, RatingSeed, TeamRating};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

/// Inputs for advancing one team's rating by one week.
#[derive(Debug, Clone, Copy)]
pub struct WeekAdvance {
    pub prior_rating: f64,
    pub opponent_prior_rating: f64,
    /// Final margin from this team's perspective (positive = won by).
    pub net_score: f64,
    /// Summed injury point impact. `None` reads as "no known injuries"
    /// (the documented zero default), not as an error.
    pub team_injury_impact: Option<f64>,
    pub opponent_injury_impact: Option<f64>,
    pub is_home: bool,
}

pub struct PowerRatingTracker {
    config: Arc<EngineConfig>,
}

impl PowerRatingTracker {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    /// What the result says the team was worth this week, in rating
    /// points: margin plus opponent strength plus the injury
    /// differential, with the venue edge backed out.
    #[inline]
    pub fn true_game_performance(&self, advance: &WeekAdvance, home_field: f64) -> f64 {
        let injury_diff = advance.team_injury_impact.unwrap_or(0.0)
            - advance.opponent_injury_impact.unwrap_or(0.0);
        let venue = if advance.is_home {
            -home_field
        } else {
            home_field
        };
        advance.net_score + advance.opponent_prior_rating + injury_diff + venue
    }

    /// One step of the rating recurrence.
    pub fn advance_week(&self, league: League, advance: &WeekAdvance) -> Result<f64> {
        let home_field = self.config.league(league)?.home_field;
        let w = self.config.ratings.prior_weight;
        let performance = self.true_game_performance(advance, home_field);
        Ok(w * advance.prior_rating + (1.0 - w) * performance)
    }

    /// Sub-rating step: offense is measured in points scored above half
    /// the league baseline total, defense in points allowed below it.
    #[inline]
    fn advance_sub_rating(&self, prior: f64, performance: f64) -> f64 {
        let w = self.config.ratings.prior_weight;
        w * prior + (1.0 - w) * performance
    }

    /// Advance both teams of a completed game and append the new
    /// ratings to the book. Fails the whole game (no partial append)
    /// when either side's prior rating is missing or out of order.
    pub fn advance_game(
        &self,
        book: &mut RatingBook,
        result: &GameResult,
        home_injury_impact: Option<f64>,
        away_injury_impact: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let params = self.config.league(result.league)?;

        let home_prior = book
            .latest(&result.home_team, result.league)
            .ok_or_else(|| EngineError::MissingInput {
                game_id: result.game_id.clone(),
                what: "home team prior rating",
            })?
            .clone();
        let away_prior = book
            .latest(&result.away_team, result.league)
            .ok_or_else(|| EngineError::MissingInput {
                game_id: result.game_id.clone(),
                what: "away team prior rating",
            })?
            .clone();

        for prior in [&home_prior, &away_prior] {
            if prior.week + 1 != result.week {
                return Err(EngineError::OutOfOrderWeek {
                    team: prior.team.clone(),
                    latest: prior.week,
                    requested: result.week,
                });
            }
        }

        let home_rating = self.advance_week(
            result.league,
            &WeekAdvance {
                prior_rating: home_prior.rating,
                opponent_prior_rating: away_prior.rating,
                net_score: result.home_net_score(),
                team_injury_impact: home_injury_impact,
                opponent_injury_impact: away_injury_impact,
                is_home: true,
            },
        )?;
        let away_rating = self.advance_week(
            result.league,
            &WeekAdvance {
                prior_rating: away_prior.rating,
                opponent_prior_rating: home_prior.rating,
                net_score: result.away_net_score(),
                team_injury_impact: away_injury_impact,
                opponent_injury_impact: home_injury_impact,
                is_home: false,
            },
        )?;

        let half_baseline = params.baseline_total / 2.0;
        let home_offense = self.advance_sub_rating(
            home_prior.offense,
            result.home_score as f64 - half_baseline,
        );
        let home_defense = self.advance_sub_rating(
            home_prior.defense,
            half_baseline - result.away_score as f64,
        );
        let away_offense = self.advance_sub_rating(
            away_prior.offense,
            result.away_score as f64 - half_baseline,
        );
        let away_defense = self.advance_sub_rating(
            away_prior.defense,
            half_baseline - result.home_score as f64,
        );

        debug!(
            game_id = %result.game_id,
            home = %result.home_team,
            away = %result.away_team,
            home_rating,
            away_rating,
            "advanced ratings"
        );

        book.append(TeamRating {
            team: result.home_team.clone(),
            league: result.league,
            week: result.week,
            rating: home_rating,
            offense: home_offense,
            defense: home_defense,
            updated_at: now,
        })?;
        book.append(TeamRating {
            team: result.away_team.clone(),
            league: result.league,
            week: result.week,
            rating: away_rating,
            offense: away_offense,
            defense: away_defense,
            updated_at: now,
        })
    }
}

// ============================================================================
// Rating Book
// ============================================================================

/// Append-only rating history, one ordered record per (team, league,
/// week). Prior weeks are never overwritten or deleted; lookups are by
/// key, never by mutating a current record.
#[derive(Debug, Default)]
pub struct RatingBook {
    histories: FxHashMap<(String, League), Vec<TeamRating>>,
}

impl RatingBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed week-0 ratings at season start. Seeds come from an external
    /// power-rating source; the engine never derives them.
    pub fn seed(&mut self, seeds: &[RatingSeed], now: DateTime<Utc>) -> Result<()> {
        for seed in seeds {
            self.append(TeamRating {
                team: seed.team.clone(),
                league: seed.league,
                week: 0,
                rating: seed.rating,
                offense: seed.offense,
                defense: seed.defense,
                updated_at: now,
            })?;
        }
        Ok(())
    }

    /// Append one weekly rating. The new week must immediately follow
    /// the team's latest recorded week.
    pub fn append(&mut self, rating: TeamRating) -> Result<()> {
        let key = (rating.team.clone(), rating.league);
        let history = self.histories.entry(key).or_default();
        if let Some(latest) = history.last() {
            if rating.week == latest.week {
                return Err(EngineError::DuplicateWeek {
                    team: rating.team,
                    week: rating.week,
                });
            }
            if rating.week != latest.week + 1 {
                return Err(EngineError::OutOfOrderWeek {
                    team: rating.team,
                    latest: latest.week,
                    requested: rating.week,
                });
            }
        }
        history.push(rating);
        Ok(())
    }

    pub fn latest(&self, team: &str, league: League) -> Option<&TeamRating> {
        self.histories
            .get(&(team.to_string(), league))
            .and_then(|h| h.last())
    }

    pub fn rating_at(&self, team: &str, league: League, week: u16) -> Option<&TeamRating> {
        self.histories
            .get(&(team.to_string(), league))
            .and_then(|h| h.iter().find(|r| r.week == week))
    }

    pub fn history(&self, team: &str, league: League) -> &[TeamRating] {
        self.histories
            .get(&(team.to_string(), league))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All teams' ratings for one week, for the weekly snapshot output.
    pub fn week_snapshot(&self, league: League, week: u16) -> Vec<TeamRating> {
        let mut snapshot: Vec<TeamRating> = self
            .histories
            .iter()
            .filter(|((_, l), _)| *l == league)
            .filter_map(|(_, h)| h.iter().find(|r| r.week == week).cloned())
            .collect();
        snapshot.sort_by(|a, b| b.rating.partial_cmp(&a.rating).unwrap_or(std::cmp::Ordering::Equal));
        snapshot
    }

    pub fn team_count(&self, league: League) -> usize {
        self.histories.keys().filter(|(_, l)| *l == league).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> PowerRatingTracker {
        PowerRatingTracker::new(Arc::new(EngineConfig::default()))
    }

    fn seed(team: &str, rating: f64) -> RatingSeed {
        RatingSeed {
            team: team.to_string(),
            league: League::NFL,
            rating,
            offense: rating / 2.0,
            defense: rating / 2.0,
        }
    }

    #[test]
    fn test_worked_rating_example() {
        // Team A (home, prior 10.0) beats Team B (away, prior 4.0)
        // 27-20 with injury impacts 3.5 vs 1.7 and home field 2.0:
        // true performance = 7 + 4 + (3.5 - 1.7) - 2.0 = 10.8
        // new rating = 0.9 * 10.0 + 0.1 * 10.8 = 10.08
        let tracker = tracker();
        let advance = WeekAdvance {
            prior_rating: 10.0,
            opponent_prior_rating: 4.0,
            net_score: 7.0,
            team_injury_impact: Some(3.5),
            opponent_injury_impact: Some(1.7),
            is_home: true,
        };
        let rating = tracker.advance_week(League::NFL, &advance).unwrap();
        assert!((rating - 10.08).abs() < 1e-9);
    }

    #[test]
    fn test_away_team_gets_venue_credit() {
        let tracker = tracker();
        let advance = WeekAdvance {
            prior_rating: 4.0,
            opponent_prior_rating: 10.0,
            net_score: -7.0,
            team_injury_impact: Some(1.7),
            opponent_injury_impact: Some(3.5),
            is_home: false,
        };
        // true performance = -7 + 10 + (1.7 - 3.5) + 2.0 = 3.2
        // new rating = 0.9 * 4.0 + 0.1 * 3.2 = 3.92
        let rating = tracker.advance_week(League::NFL, &advance).unwrap();
        assert!((rating - 3.92).abs() < 1e-9);
    }

    #[test]
    fn test_missing_injury_impact_defaults_to_zero() {
        let tracker = tracker();
        let advance = WeekAdvance {
            prior_rating: 10.0,
            opponent_prior_rating: 4.0,
            net_score: 7.0,
            team_injury_impact: None,
            opponent_injury_impact: None,
            is_home: true,
        };
        // true performance = 7 + 4 + 0 - 2 = 9.0 -> 0.9*10 + 0.1*9 = 9.9
        let rating = tracker.advance_week(League::NFL, &advance).unwrap();
        assert!((rating - 9.9).abs() < 1e-9);
    }

    #[test]
    fn test_recurrence_is_deterministic() {
        let tracker = tracker();
        let advance = WeekAdvance {
            prior_rating: 12.25,
            opponent_prior_rating: -3.0,
            net_score: 10.0,
            team_injury_impact: Some(0.5),
            opponent_injury_impact: Some(2.0),
            is_home: false,
        };
        let first = tracker.advance_week(League::NFL, &advance).unwrap();
        let second = tracker.advance_week(League::NFL, &advance).unwrap();
        assert_eq!(first, second);
    }

    fn game(week: u16, home: &str, away: &str, home_score: u16, away_score: u16) -> GameResult {
        GameResult {
            game_id: format!("w{week}-{home}-{away}"),
            league: League::NFL,
            week,
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_score,
            away_score,
        }
    }

    #[test]
    fn test_advance_game_appends_both_teams() {
        let tracker = tracker();
        let mut book = RatingBook::new();
        book.seed(&[seed("GB", 10.0), seed("CHI", 4.0)], Utc::now())
            .unwrap();

        tracker
            .advance_game(
                &mut book,
                &game(1, "GB", "CHI", 27, 20),
                Some(3.5),
                Some(1.7),
                Utc::now(),
            )
            .unwrap();

        let gb = book.latest("GB", League::NFL).unwrap();
        assert_eq!(gb.week, 1);
        assert!((gb.rating - 10.08).abs() < 1e-9);
        let chi = book.latest("CHI", League::NFL).unwrap();
        assert_eq!(chi.week, 1);
        assert!((chi.rating - 3.92).abs() < 1e-9);
        assert_eq!(book.history("GB", League::NFL).len(), 2);
    }

    #[test]
    fn test_unseeded_opponent_is_hard_error() {
        let tracker = tracker();
        let mut book = RatingBook::new();
        book.seed(&[seed("GB", 10.0)], Utc::now()).unwrap();

        let err = tracker
            .advance_game(&mut book, &game(1, "GB", "CHI", 27, 20), None, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingInput { .. }));
        // No partial append: GB history still only week 0.
        assert_eq!(book.history("GB", League::NFL).len(), 1);
    }

    #[test]
    fn test_out_of_order_week_is_hard_error() {
        let tracker = tracker();
        let mut book = RatingBook::new();
        book.seed(&[seed("GB", 10.0), seed("CHI", 4.0)], Utc::now())
            .unwrap();

        // Week 3 cannot be advanced before weeks 1 and 2.
        let err = tracker
            .advance_game(&mut book, &game(3, "GB", "CHI", 21, 17), None, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::OutOfOrderWeek { .. }));
    }

    #[test]
    fn test_duplicate_week_rejected() {
        let mut book = RatingBook::new();
        book.seed(&[seed("GB", 10.0)], Utc::now()).unwrap();
        let err = book
            .append(TeamRating {
                team: "GB".to_string(),
                league: League::NFL,
                week: 0,
                rating: 11.0,
                offense: 5.0,
                defense: 5.0,
                updated_at: Utc::now(),
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateWeek { .. }));
    }

    #[test]
    fn test_week_snapshot_sorted_by_rating() {
        let mut book = RatingBook::new();
        book.seed(
            &[seed("GB", 10.0), seed("CHI", 4.0), seed("DET", 8.0)],
            Utc::now(),
        )
        .unwrap();
        let snapshot = book.week_snapshot(League::NFL, 0);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].team, "GB");
        assert_eq!(snapshot[2].team, "CHI");
    }
}
