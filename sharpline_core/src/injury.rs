//! Injury impact model.
//!
//! This module provides:
//! - Per-player point deductions from position value, injury type and
//!   days since injury
//! - Linear capacity recovery over each injury type's window
//! - Status-only fallbacks when the description cannot be resolved
//! - Team-level aggregation with severity and data-confidence labels
//!
//! Capacity is the fraction of a player's full point value they are
//! assumed to contribute. It interpolates from the injury type's
//! immediate fraction on day 0 to 1.0 at the end of the recovery
//! window, and is capped by the status capacity (a player listed Out
//! contributes nothing however far along the recovery curve is).

use crate::config::{EngineConfig, InjuryTypeParams};
use crate::error::{EngineError, Result};
use crate::models::{DataConfidence, InjuryImpact, InjuryRecord, InjuryStatus, Severity, TeamInjuryImpact};
use crate::utils::matching::{match_keyword, normalize};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::Arc;
use tracing::warn;

pub struct InjuryImpactModel {
    config: Arc<EngineConfig>,
    /// Word-boundary patterns per configured injury type, compiled once.
    keyword_patterns: Vec<Vec<Regex>>,
}

impl InjuryImpactModel {
    pub fn new(config: Arc<EngineConfig>) -> Result<Self> {
        let mut keyword_patterns = Vec::with_capacity(config.injury.types.len());
        for params in &config.injury.types {
            let mut patterns = Vec::with_capacity(params.keywords.len());
            for keyword in &params.keywords {
                let pattern = format!(r"\b{}\b", regex::escape(&normalize(keyword)));
                let regex = Regex::new(&pattern).map_err(|e| {
                    EngineError::InvalidConfig(format!(
                        "injury keyword {keyword:?} does not compile: {e}"
                    ))
                })?;
                patterns.push(regex);
            }
            keyword_patterns.push(patterns);
        }
        Ok(Self {
            config,
            keyword_patterns,
        })
    }

    /// Capacity fraction for an injury type on a given day: linear from
    /// the immediate fraction at day 0 to 1.0 at the end of the
    /// recovery window, clamped at 1.0 thereafter.
    #[inline]
    pub fn capacity_on_day(params: &InjuryTypeParams, day: u32) -> f64 {
        if params.recovery_days == 0 || day >= params.recovery_days {
            return 1.0;
        }
        let progress = day as f64 / params.recovery_days as f64;
        params.immediate_capacity + (1.0 - params.immediate_capacity) * progress
    }

    /// Resolve a free-text injury description to a configured type.
    /// Whole-word keyword matches win; otherwise the best fuzzy keyword
    /// match above the configured threshold.
    pub fn resolve_type(&self, description: &str) -> Option<&InjuryTypeParams> {
        let normalized = normalize(description);
        if normalized.is_empty() {
            return None;
        }

        for (idx, patterns) in self.keyword_patterns.iter().enumerate() {
            if patterns.iter().any(|p| p.is_match(&normalized)) {
                return Some(&self.config.injury.types[idx]);
            }
        }

        let threshold = self.config.injury.fuzzy_match_threshold;
        let mut best: Option<(usize, f64)> = None;
        for (idx, params) in self.config.injury.types.iter().enumerate() {
            for keyword in &params.keywords {
                let m = match_keyword(&normalized, keyword, threshold);
                if m.is_match() && best.map_or(true, |(_, score)| m.score > score) {
                    best = Some((idx, m.score));
                }
            }
        }
        best.map(|(idx, _)| &self.config.injury.types[idx])
    }

    /// Point impact for one player.
    ///
    /// `base_value` is the player's full point value by position/tier.
    /// `days_since_injury` of `None` is treated as day 0 (maximum
    /// impact), the conservative assumption.
    pub fn impact(
        &self,
        base_value: f64,
        params: &InjuryTypeParams,
        status: InjuryStatus,
        days_since_injury: Option<u32>,
    ) -> InjuryImpact {
        let day = days_since_injury.unwrap_or(0);
        let curve = Self::capacity_on_day(params, day);
        // Status caps the recovery curve: Out is Out.
        let capacity = curve.min(self.config.status_capacity(status));
        let point_impact = (base_value * (1.0 - capacity)).clamp(0.0, base_value.max(0.0));
        InjuryImpact {
            player: String::new(),
            position: String::new(),
            base_value,
            capacity,
            point_impact,
            explanation: format!(
                "{} day {}/{}: capacity {:.2}, -{:.2} pts",
                params.name, day, params.recovery_days, capacity, point_impact
            ),
        }
    }

    /// Status-only impact used when no injury type can be extracted.
    /// These capacities do not decay.
    pub fn status_only_impact(&self, base_value: f64, status: InjuryStatus) -> InjuryImpact {
        let capacity = self.config.status_capacity(status);
        let point_impact = (base_value * (1.0 - capacity)).clamp(0.0, base_value.max(0.0));
        InjuryImpact {
            player: String::new(),
            position: String::new(),
            base_value,
            capacity,
            point_impact,
            explanation: format!(
                "status {}: capacity {:.2}, -{:.2} pts",
                status.as_str(),
                capacity,
                point_impact
            ),
        }
    }

    /// Evaluate one injury report row as of a date.
    pub fn player_impact(&self, record: &InjuryRecord, as_of: NaiveDate) -> InjuryImpact {
        let base_value = match self.config.position_value(&record.position) {
            Some(points) => points,
            None => {
                warn!(
                    player = %record.player,
                    position = %record.position,
                    "unknown position, using league-average base value"
                );
                self.config.injury.default_position_value
            }
        };

        let days = (as_of - record.reported_on).num_days().max(0) as u32;
        let mut impact = match self.resolve_type(&record.description) {
            Some(params) => self.impact(base_value, params, record.status, Some(days)),
            None => {
                if !record.description.trim().is_empty() {
                    warn!(
                        player = %record.player,
                        description = %record.description,
                        "unrecognized injury description, using status-only capacity"
                    );
                }
                self.status_only_impact(base_value, record.status)
            }
        };
        impact.player = record.player.clone();
        impact.position = record.position.clone();
        impact
    }

    /// Aggregate a team's injury report for one week.
    ///
    /// Later records supersede earlier ones for the same player (the
    /// feed is re-ingested whole; records are never merged). Severity
    /// comes from the configured point thresholds; confidence reflects
    /// how many records resolved a typed injury rather than falling
    /// back to status-only capacity. An empty report reads as Low
    /// confidence: it cannot be distinguished from a missing feed.
    pub fn team_impact(
        &self,
        team: &str,
        week: u16,
        records: &[InjuryRecord],
        as_of: NaiveDate,
    ) -> TeamInjuryImpact {
        // Last record per player wins.
        let mut latest: Vec<&InjuryRecord> = Vec::new();
        for record in records.iter().filter(|r| r.team == team) {
            if let Some(slot) = latest.iter_mut().find(|r| r.player == record.player) {
                *slot = record;
            } else {
                latest.push(record);
            }
        }

        let mut players = Vec::new();
        let mut typed = 0usize;
        let mut fallbacks = 0usize;
        for &record in &latest {
            if record.status == InjuryStatus::Active && self.resolve_type(&record.description).is_none() {
                continue;
            }
            match self.resolve_type(&record.description) {
                Some(_) => typed += 1,
                None => fallbacks += 1,
            }
            let impact = self.player_impact(record, as_of);
            if impact.point_impact > 0.0 {
                players.push(impact);
            }
        }

        let total_points: f64 = players.iter().map(|p| p.point_impact).sum();
        let severity = self.classify_severity(total_points);
        let confidence = if latest.is_empty() {
            DataConfidence::Low
        } else if fallbacks == 0 {
            DataConfidence::High
        } else if fallbacks * 2 <= typed + fallbacks {
            DataConfidence::Medium
        } else {
            DataConfidence::Low
        };

        TeamInjuryImpact {
            team: team.to_string(),
            week,
            total_points,
            severity,
            confidence,
            players,
        }
    }

    #[inline]
    fn classify_severity(&self, total_points: f64) -> Severity {
        let thresholds = &self.config.injury.severity;
        if total_points >= thresholds.critical_at {
            Severity::Critical
        } else if total_points >= thresholds.major_at {
            Severity::Major
        } else if total_points >= thresholds.moderate_at {
            Severity::Moderate
        } else {
            Severity::Minor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::League;

    fn model() -> InjuryImpactModel {
        InjuryImpactModel::new(Arc::new(EngineConfig::default())).unwrap()
    }

    fn record(
        player: &str,
        position: &str,
        status: InjuryStatus,
        description: &str,
        reported_on: NaiveDate,
    ) -> InjuryRecord {
        InjuryRecord {
            team: "GB".to_string(),
            league: League::NFL,
            player: player.to_string(),
            position: position.to_string(),
            status,
            description: description.to_string(),
            reported_on,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 1).unwrap() + chrono::Days::new(d as u64)
    }

    #[test]
    fn test_capacity_interpolates_linearly() {
        let params = InjuryTypeParams {
            name: "hamstring".to_string(),
            keywords: vec!["hamstring".to_string()],
            immediate_capacity: 0.55,
            recovery_days: 21,
        };
        assert_eq!(InjuryImpactModel::capacity_on_day(&params, 0), 0.55);
        // Halfway through a 21-day window (day 10.5 is not a day, use 7):
        // 0.55 + 0.45 * 7/21 = 0.70
        assert!((InjuryImpactModel::capacity_on_day(&params, 7) - 0.70).abs() < 1e-9);
        assert_eq!(InjuryImpactModel::capacity_on_day(&params, 21), 1.0);
        assert_eq!(InjuryImpactModel::capacity_on_day(&params, 400), 1.0);
    }

    #[test]
    fn test_capacity_is_monotone_and_bounded_for_all_defaults() {
        let config = EngineConfig::default();
        for params in &config.injury.types {
            let mut prev = 0.0;
            for d in 0..=params.recovery_days + 5 {
                let cap = InjuryImpactModel::capacity_on_day(params, d);
                assert!(cap >= params.immediate_capacity - 1e-12, "{}", params.name);
                assert!(cap <= 1.0, "{}", params.name);
                assert!(cap >= prev - 1e-12, "{} not monotone at day {}", params.name, d);
                prev = cap;
            }
        }
    }

    #[test]
    fn test_point_impact_bounds() {
        let m = model();
        let params = &m.config.injury.types[1]; // hamstring
        for d in [0, 3, 10, 21, 50] {
            let impact = m.impact(7.0, params, InjuryStatus::Questionable, Some(d));
            assert!(impact.point_impact >= 0.0);
            assert!(impact.point_impact <= 7.0);
        }
    }

    #[test]
    fn test_status_caps_recovery_curve() {
        let m = model();
        let params = m.resolve_type("ankle sprain").unwrap();
        // Day 14 of a 14-day ankle window: curve says fully recovered,
        // but the player is listed Out and contributes nothing.
        let impact = m.impact(7.0, params, InjuryStatus::Out, Some(14));
        assert_eq!(impact.capacity, 0.0);
        assert_eq!(impact.point_impact, 7.0);
    }

    #[test]
    fn test_missing_days_means_day_zero() {
        let m = model();
        let params = m.resolve_type("hamstring strain").unwrap();
        let unknown = m.impact(4.0, params, InjuryStatus::Questionable, None);
        let day0 = m.impact(4.0, params, InjuryStatus::Questionable, Some(0));
        assert_eq!(unknown.point_impact, day0.point_impact);
    }

    #[test]
    fn test_resolve_type_from_description() {
        let m = model();
        assert_eq!(m.resolve_type("left hamstring strain").unwrap().name, "hamstring");
        assert_eq!(m.resolve_type("torn ACL").unwrap().name, "acl");
        // Fuzzy: feed typo still resolves
        assert_eq!(m.resolve_type("hamstrng tightness").unwrap().name, "hamstring");
        assert!(m.resolve_type("coach's decision").is_none());
    }

    #[test]
    fn test_unparseable_description_uses_status_only() {
        let m = model();
        let rec = record(
            "J. Carter",
            "WR",
            InjuryStatus::Doubtful,
            "undisclosed",
            day(0),
        );
        let impact = m.player_impact(&rec, day(0));
        // Doubtful fallback capacity is 0.35 -> 1.5 * 0.65 points lost
        assert!((impact.capacity - 0.35).abs() < 1e-9);
        assert!((impact.point_impact - 1.5 * 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_position_uses_league_average() {
        let m = model();
        let rec = record("E. Rush", "EDGE", InjuryStatus::Out, "knee", day(0));
        let impact = m.player_impact(&rec, day(0));
        assert_eq!(impact.base_value, 1.0);
        assert_eq!(impact.point_impact, 1.0);
    }

    #[test]
    fn test_team_aggregation_and_severity() {
        let m = model();
        let records = vec![
            record("A. Starr", "QB", InjuryStatus::Out, "concussion", day(0)),
            record("B. Runner", "RB", InjuryStatus::Questionable, "ankle", day(0)),
        ];
        let team = m.team_impact("GB", 5, &records, day(0));
        // QB out: 7.0; RB ankle day 0 capacity 0.70 capped by
        // questionable 0.92 -> 0.70, impact 1.5 * 0.30 = 0.45
        assert!((team.total_points - 7.45).abs() < 1e-9);
        assert_eq!(team.severity, Severity::Critical);
        assert_eq!(team.confidence, DataConfidence::High);
        assert_eq!(team.players.len(), 2);
    }

    #[test]
    fn test_later_record_supersedes_earlier() {
        let m = model();
        let records = vec![
            record("A. Starr", "QB", InjuryStatus::Out, "concussion", day(0)),
            record("A. Starr", "QB", InjuryStatus::Active, "", day(6)),
        ];
        let team = m.team_impact("GB", 5, &records, day(6));
        assert_eq!(team.total_points, 0.0);
        assert_eq!(team.severity, Severity::Minor);
    }

    #[test]
    fn test_empty_report_is_low_confidence() {
        let m = model();
        let team = m.team_impact("GB", 5, &[], day(0));
        assert_eq!(team.total_points, 0.0);
        assert_eq!(team.confidence, DataConfidence::Low);
    }

    #[test]
    fn test_mixed_fallbacks_lower_confidence() {
        let m = model();
        let records = vec![
            record("A. Starr", "QB", InjuryStatus::Out, "concussion", day(0)),
            record("B. Runner", "RB", InjuryStatus::Doubtful, "undisclosed", day(0)),
        ];
        let team = m.team_impact("GB", 5, &records, day(0));
        assert_eq!(team.confidence, DataConfidence::Medium);
    }
}
