//! Closing line value tracking.
//!
//! CLV is the engine's ground-truth performance metric: the difference
//! between the number obtained at bet time and the number at market
//! close, sign-normalized so positive always means the bettor beat the
//! close. Entry records are append-only; the closing line is written
//! exactly once per bet and the record is immutable afterwards, so the
//! metric cannot be silently corrupted by a replayed update.

use crate::error::{EngineError, Result};
use crate::models::{BetSide, ClvRecord, League};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::info;
use uuid::Uuid;

/// Filter for CLV aggregates. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ClvFilter {
    pub league: Option<League>,
    pub side: Option<BetSide>,
    /// Bounds on the entry timestamp.
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ClvFilter {
    fn matches(&self, record: &ClvRecord) -> bool {
        if let Some(league) = self.league {
            if record.league != league {
                return false;
            }
        }
        if let Some(side) = self.side {
            if record.side != side {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.entered_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.entered_at > to {
                return false;
            }
        }
        true
    }
}

/// Aggregate CLV statistics over closed records.
#[derive(Debug, Clone, Default)]
pub struct ClvSummary {
    pub count: usize,
    pub mean: Option<f64>,
    /// Mean over the most recent closes minus the overall mean;
    /// positive = improving.
    pub trend: Option<f64>,
}

pub struct ClosingLineTracker {
    records: RwLock<FxHashMap<Uuid, ClvRecord>>,
    /// Window used for the trend statistic.
    trend_window: usize,
}

impl Default for ClosingLineTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ClosingLineTracker {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(FxHashMap::default()),
            trend_window: 20,
        }
    }

    /// Record a bet at entry under a caller-supplied id.
    pub fn record_entry(
        &self,
        bet_id: Uuid,
        game_id: &str,
        league: League,
        side: BetSide,
        entry_line: f64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut records = self.records.write();
        if records.contains_key(&bet_id) {
            return Err(EngineError::DuplicateBet { bet_id });
        }
        records.insert(
            bet_id,
            ClvRecord {
                bet_id,
                game_id: game_id.to_string(),
                league,
                side,
                entry_line,
                closing_line: None,
                entered_at: now,
                closed_at: None,
            },
        );
        Ok(())
    }

    /// Record a bet at entry under a fresh id.
    pub fn log_entry(
        &self,
        game_id: &str,
        league: League,
        side: BetSide,
        entry_line: f64,
        now: DateTime<Utc>,
    ) -> Uuid {
        let bet_id = Uuid::new_v4();
        let mut records = self.records.write();
        records.insert(
            bet_id,
            ClvRecord {
                bet_id,
                game_id: game_id.to_string(),
                league,
                side,
                entry_line,
                closing_line: None,
                entered_at: now,
                closed_at: None,
            },
        );
        bet_id
    }

    /// Record the closing line for a bet. Permitted exactly once; the
    /// check and the write happen under one write lock, so concurrent
    /// duplicate calls cannot both succeed.
    pub fn record_close(&self, bet_id: Uuid, closing_line: f64, now: DateTime<Utc>) -> Result<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&bet_id)
            .ok_or(EngineError::UnknownBet { bet_id })?;
        if record.closing_line.is_some() {
            return Err(EngineError::DuplicateClose { bet_id });
        }
        record.closing_line = Some(closing_line);
        record.closed_at = Some(now);
        info!(
            %bet_id,
            game_id = %record.game_id,
            clv = record.clv_points().unwrap_or(0.0),
            "bet closed"
        );
        Ok(())
    }

    pub fn record(&self, bet_id: Uuid) -> Option<ClvRecord> {
        self.records.read().get(&bet_id).cloned()
    }

    /// Average CLV in points over closed records matching the filter.
    /// In-flight records are excluded, not treated as zero. `None` when
    /// nothing has closed yet.
    pub fn average_clv(&self, filter: &ClvFilter) -> Option<f64> {
        let records = self.records.read();
        let points: Vec<f64> = records
            .values()
            .filter(|r| filter.matches(r))
            .filter_map(|r| r.clv_points())
            .collect();
        if points.is_empty() {
            return None;
        }
        Some(points.iter().sum::<f64>() / points.len() as f64)
    }

    /// Mean, count and trend over closed records matching the filter.
    pub fn summary(&self, filter: &ClvFilter) -> ClvSummary {
        let records = self.records.read();
        let mut closed: Vec<(&ClvRecord, f64)> = records
            .values()
            .filter(|r| filter.matches(r))
            .filter_map(|r| r.clv_points().map(|clv| (r, clv)))
            .collect();
        closed.sort_by_key(|(r, _)| r.closed_at);

        let count = closed.len();
        if count == 0 {
            return ClvSummary::default();
        }
        let mean = closed.iter().map(|(_, clv)| clv).sum::<f64>() / count as f64;
        let trend = if count > self.trend_window {
            let recent = &closed[count - self.trend_window..];
            let recent_mean =
                recent.iter().map(|(_, clv)| clv).sum::<f64>() / recent.len() as f64;
            Some(recent_mean - mean)
        } else {
            None
        };

        ClvSummary {
            count,
            mean: Some(mean),
            trend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn tracker() -> ClosingLineTracker {
        ClosingLineTracker::new()
    }

    #[test]
    fn test_worked_clv_example() {
        // Entry +3.0, close +5.5 on the same side: CLV +2.5.
        let tracker = tracker();
        let bet = tracker.log_entry("g1", League::NFL, BetSide::Away, 3.0, Utc::now());
        tracker.record_close(bet, 5.5, Utc::now()).unwrap();
        let record = tracker.record(bet).unwrap();
        assert_eq!(record.clv_points(), Some(2.5));
        assert_eq!(tracker.average_clv(&ClvFilter::default()), Some(2.5));
    }

    #[test]
    fn test_duplicate_close_is_hard_error() {
        let tracker = tracker();
        let bet = tracker.log_entry("g1", League::NFL, BetSide::Home, -3.0, Utc::now());
        tracker.record_close(bet, -4.0, Utc::now()).unwrap();
        let err = tracker.record_close(bet, -7.0, Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateClose { .. }));
        // The first write stands.
        assert_eq!(tracker.record(bet).unwrap().closing_line, Some(-4.0));
    }

    #[test]
    fn test_unknown_bet_rejected() {
        let tracker = tracker();
        let err = tracker
            .record_close(Uuid::new_v4(), -3.0, Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownBet { .. }));
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let tracker = tracker();
        let bet_id = Uuid::new_v4();
        tracker
            .record_entry(bet_id, "g1", League::NFL, BetSide::Home, -3.0, Utc::now())
            .unwrap();
        let err = tracker
            .record_entry(bet_id, "g1", League::NFL, BetSide::Home, -3.5, Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateBet { .. }));
    }

    #[test]
    fn test_in_flight_records_excluded_from_average() {
        let tracker = tracker();
        let closed = tracker.log_entry("g1", League::NFL, BetSide::Away, 3.0, Utc::now());
        tracker.record_close(closed, 5.5, Utc::now()).unwrap();

        let before = tracker.average_clv(&ClvFilter::default());
        // An in-flight bet must not move the average (it is excluded,
        // not treated as zero).
        tracker.log_entry("g2", League::NFL, BetSide::Home, -6.0, Utc::now());
        let after = tracker.average_clv(&ClvFilter::default());
        assert_eq!(before, after);
        assert_eq!(after, Some(2.5));
    }

    #[test]
    fn test_filter_by_league() {
        let tracker = tracker();
        let nfl = tracker.log_entry("g1", League::NFL, BetSide::Away, 3.0, Utc::now());
        tracker.record_close(nfl, 5.5, Utc::now()).unwrap();
        let nba = tracker.log_entry("g2", League::NBA, BetSide::Home, 4.0, Utc::now());
        tracker.record_close(nba, 1.5, Utc::now()).unwrap();

        let filter = ClvFilter {
            league: Some(League::NBA),
            ..Default::default()
        };
        // Home bet, margin moved from 4.0 to 1.5 against: CLV -2.5.
        assert_eq!(tracker.average_clv(&filter), Some(-2.5));
        assert_eq!(tracker.average_clv(&ClvFilter::default()), Some(0.0));
    }

    #[test]
    fn test_summary_counts_and_mean() {
        let tracker = tracker();
        for (line, close) in [(3.0, 5.5), (2.0, 2.0), (-1.0, 0.5)] {
            let bet = tracker.log_entry("g", League::NFL, BetSide::Away, line, Utc::now());
            tracker.record_close(bet, close, Utc::now()).unwrap();
        }
        tracker.log_entry("open", League::NFL, BetSide::Away, 1.0, Utc::now());

        let summary = tracker.summary(&ClvFilter::default());
        assert_eq!(summary.count, 3);
        // (2.5 + 0.0 + 1.5) / 3
        assert!((summary.mean.unwrap() - 4.0 / 3.0).abs() < 1e-9);
        assert!(summary.trend.is_none());
    }

    #[test]
    fn test_concurrent_duplicate_close_single_winner() {
        let tracker = Arc::new(ClosingLineTracker::new());
        let bet = tracker.log_entry("g1", League::NFL, BetSide::Home, -3.0, Utc::now());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    tracker
                        .record_close(bet, -4.0 - i as f64, Utc::now())
                        .is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap_or(false))
            .filter(|&ok| ok)
            .count();
        assert_eq!(successes, 1);
    }
}
