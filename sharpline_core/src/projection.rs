//! Line projection.
//!
//! Combines two teams' current ratings, the league home-field constant,
//! the current-week injury differential and the situational/weather
//! adjustments into a projected spread and total. Every contributing
//! term is kept in the breakdown so downstream explanations and audits
//! can reconstruct the number exactly. Projected lines are never
//! clamped: an implausible projection is a data-quality signal that
//! belongs upstream, not something to hide here.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::{AdjustmentTerm, GameProjection, MatchupContext, TeamInjuryImpact, TeamRating};
use crate::situational::SituationalAdjustmentModel;
use std::sync::Arc;

/// Logistic function mapping a projected margin to a win probability.
#[inline]
fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Everything needed to project one upcoming game.
pub struct ProjectionInputs<'a> {
    pub game_id: &'a str,
    pub home: &'a TeamRating,
    pub away: &'a TeamRating,
    /// Current-week injury impacts. `None` reads as "no known
    /// injuries", the same documented default the rating tracker uses.
    pub home_injuries: Option<&'a TeamInjuryImpact>,
    pub away_injuries: Option<&'a TeamInjuryImpact>,
    pub context: &'a MatchupContext,
}

pub struct LineProjector {
    config: Arc<EngineConfig>,
    situational: SituationalAdjustmentModel,
}

impl LineProjector {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        let situational = SituationalAdjustmentModel::new(config.clone());
        Self {
            config,
            situational,
        }
    }

    /// Project the spread and total for one game.
    ///
    /// `home_margin = (home_rating - away_rating) + home_field +
    /// injury_differential + situational deltas`; the quoted `spread`
    /// is the same number in book convention (negative = home favored).
    /// `projected_total = league_baseline + total deltas`.
    pub fn project(&self, inputs: &ProjectionInputs<'_>) -> Result<GameProjection> {
        let context = inputs.context;
        let params = self.config.league(context.league)?;

        let rating_diff = inputs.home.rating - inputs.away.rating;
        let injury_diff = inputs.away_injuries.map_or(0.0, |i| i.total_points)
            - inputs.home_injuries.map_or(0.0, |i| i.total_points);

        let mut breakdown = vec![
            AdjustmentTerm::spread("rating_differential", rating_diff),
            AdjustmentTerm::spread("home_field", params.home_field),
        ];
        if injury_diff != 0.0 {
            breakdown.push(AdjustmentTerm::spread("injury_differential", injury_diff));
        }
        breakdown.push(AdjustmentTerm::total(
            "league_baseline_total",
            params.baseline_total,
        ));

        // Orient underdog/favorite factors off the pre-situational margin.
        let pre_margin = rating_diff + params.home_field + injury_diff;
        let adjustments = self.situational.adjust(context, pre_margin >= 0.0);
        breakdown.extend(adjustments.terms.iter().cloned());

        let home_margin = pre_margin + adjustments.spread_delta();
        let total = params.baseline_total + adjustments.total_delta();
        let home_win_prob = logistic(home_margin / params.spread_prob_scale);

        Ok(GameProjection {
            game_id: inputs.game_id.to_string(),
            league: context.league,
            week: context.week,
            home_team: context.home_team.clone(),
            away_team: context.away_team.clone(),
            home_margin,
            spread: -home_margin,
            total,
            home_win_prob,
            breakdown,
        })
    }
}
