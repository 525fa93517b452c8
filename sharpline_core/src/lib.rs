//! Sharpline Core - Line valuation and edge detection for sports markets.
//!
//! This crate provides:
//! - Weekly power-rating recurrence with append-only history
//! - Injury impact valuation with recovery-window decay
//! - Situational and weather adjustments with auditable breakdowns
//! - Spread/total/moneyline projection for upcoming games
//! - Edge classification against posted market lines with Kelly-derived
//!   stake sizing and key-number handling
//! - Closing-line-value tracking as the ground-truth performance metric
//!
//! The engine is batch-oriented and pure: data acquisition, persistence
//! and report formatting live in external collaborators. The weekly
//! batch functions below fan out across games with rayon; projections
//! and edge detections are independent per game, while rating
//! advancement is strictly sequential per team.

pub mod clv;
pub mod config;
pub mod edge;
pub mod error;
pub mod ingest;
pub mod injury;
pub mod logging;
pub mod models;
pub mod projection;
pub mod ratings;
pub mod situational;
pub mod utils;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::info;

use chrono::{DateTime, Utc};

pub use clv::{ClosingLineTracker, ClvFilter, ClvSummary};
pub use config::EngineConfig;
pub use edge::{EdgeDetector, EdgeHistory};
pub use error::EngineError;
pub use ingest::{partition_valid, Validator};
pub use injury::InjuryImpactModel;
pub use models::*;
pub use projection::{LineProjector, ProjectionInputs};
pub use ratings::{PowerRatingTracker, RatingBook, WeekAdvance};
pub use situational::SituationalAdjustmentModel;

/// Advance the rating book through one completed week.
///
/// Rating updates are sequential per team (each depends on the prior
/// week's value), so this runs in feed order. Each game that cannot be
/// settled - failed validation, missing prior rating, out-of-order
/// week - is reported in the returned `WeekReport` and skipped without
/// blocking the rest of the batch. Missing injury impacts default to
/// zero ("no known injuries"), which is a documented default rather
/// than an error.
pub fn settle_week(
    tracker: &PowerRatingTracker,
    validator: &Validator,
    book: &mut RatingBook,
    results: &[GameResult],
    injuries: &FxHashMap<String, TeamInjuryImpact>,
    now: DateTime<Utc>,
) -> WeekReport {
    let mut report = WeekReport::default();
    for result in results {
        if let Err(err) = validator.validate_game_result(result) {
            report.skip(&result.game_id, err.to_string());
            continue;
        }
        let home_impact = injuries.get(&result.home_team).map(|i| i.total_points);
        let away_impact = injuries.get(&result.away_team).map(|i| i.total_points);
        match tracker.advance_game(book, result, home_impact, away_impact, now) {
            Ok(()) => report.processed += 1,
            Err(err) => report.skip(&result.game_id, err.to_string()),
        }
    }
    info!(
        processed = report.processed,
        skipped = report.skipped.len(),
        "settled week"
    );
    report
}

/// Project every game on an upcoming slate from the current rating
/// book. Projections share no mutable state and run in parallel.
pub fn project_week(
    projector: &LineProjector,
    book: &RatingBook,
    games: &[UpcomingGame],
) -> (Vec<GameProjection>, WeekReport) {
    let outcomes: Vec<_> = games
        .par_iter()
        .map(|game| {
            let context = &game.context;
            let home = book
                .latest(&context.home_team, context.league)
                .ok_or_else(|| EngineError::MissingInput {
                    game_id: game.game_id.clone(),
                    what: "home team rating",
                })?;
            let away = book
                .latest(&context.away_team, context.league)
                .ok_or_else(|| EngineError::MissingInput {
                    game_id: game.game_id.clone(),
                    what: "away team rating",
                })?;
            projector.project(&ProjectionInputs {
                game_id: &game.game_id,
                home,
                away,
                home_injuries: game.home_injuries.as_ref(),
                away_injuries: game.away_injuries.as_ref(),
                context,
            })
        })
        .collect();

    let mut report = WeekReport::default();
    let mut projections = Vec::with_capacity(outcomes.len());
    for (game, outcome) in games.iter().zip(outcomes) {
        match outcome {
            Ok(projection) => {
                report.processed += 1;
                projections.push(projection);
            }
            Err(err) => report.skip(&game.game_id, err.to_string()),
        }
    }
    info!(
        projected = report.processed,
        skipped = report.skipped.len(),
        "projected week"
    );
    (projections, report)
}

/// Grade a slate of projections against market line snapshots. Lines
/// failing range validation and games with no usable line are reported
/// and skipped. Detections are independent per game and run in
/// parallel; every result is appended to the history (never
/// overwriting a prior run).
pub fn detect_week_edges(
    detector: &EdgeDetector,
    validator: &Validator,
    history: &mut EdgeHistory,
    projections: &[GameProjection],
    lines: &[MarketLine],
    now: DateTime<Utc>,
) -> (Vec<EdgeResult>, WeekReport) {
    let mut report = WeekReport::default();

    let mut by_game: FxHashMap<&str, &MarketLine> = FxHashMap::default();
    for line in lines {
        match validator.validate_market_line(line) {
            // Later snapshots for the same game supersede earlier ones.
            Ok(()) => {
                by_game.insert(line.game_id.as_str(), line);
            }
            Err(err) => report.skip(&line.game_id, err.to_string()),
        }
    }

    let outcomes: Vec<_> = projections
        .par_iter()
        .map(|projection| match by_game.get(projection.game_id.as_str()) {
            Some(&line) => detector.detect_all(projection, line, now),
            None => Err(EngineError::MissingInput {
                game_id: projection.game_id.clone(),
                what: "market line",
            }),
        })
        .collect();

    let mut results = Vec::new();
    for (projection, outcome) in projections.iter().zip(outcomes) {
        match outcome {
            Ok(edges) => {
                report.processed += 1;
                for edge in edges {
                    history.append(edge.clone());
                    results.push(edge);
                }
            }
            Err(err) => report.skip(&projection.game_id, err.to_string()),
        }
    }
    info!(
        graded = report.processed,
        edges = results.len(),
        skipped = report.skipped.len(),
        "detected week edges"
    );
    (results, report)
}
