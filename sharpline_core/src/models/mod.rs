// Shared models for the Sharpline valuation engine
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// League Enum
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum League {
    NFL,
    NCAAF,
    NBA,
    NCAAB,
}

impl League {
    pub fn as_str(&self) -> &'static str {
        match self {
            League::NFL => "NFL",
            League::NCAAF => "NCAAF",
            League::NBA => "NBA",
            League::NCAAB => "NCAAB",
        }
    }
}

// ============================================================================
// External Input Records
// ============================================================================

/// Per-team seed supplied at season start. Ratings before week 1 are not
/// derived by the engine; they come from an external power-rating source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingSeed {
    pub team: String,
    pub league: League,
    pub rating: f64,
    pub offense: f64,
    pub defense: f64,
}

/// A completed game as reported by the results feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResult {
    pub game_id: String,
    pub league: League,
    pub week: u16,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u16,
    pub away_score: u16,
}

impl GameResult {
    /// Net score from the home team's perspective (positive = home won by that many).
    pub fn home_net_score(&self) -> f64 {
        self.home_score as f64 - self.away_score as f64
    }

    /// Net score from the away team's perspective.
    pub fn away_net_score(&self) -> f64 {
        -self.home_net_score()
    }
}

/// Player availability status from the injury feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjuryStatus {
    Active,
    Questionable,
    Doubtful,
    Out,
    InjuredReserve,
}

impl InjuryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InjuryStatus::Active => "active",
            InjuryStatus::Questionable => "questionable",
            InjuryStatus::Doubtful => "doubtful",
            InjuryStatus::Out => "out",
            InjuryStatus::InjuredReserve => "injured_reserve",
        }
    }
}

/// One row of an ingested injury report. Each ingestion supersedes the
/// previous record for the same player; records are never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryRecord {
    pub team: String,
    pub league: League,
    pub player: String,
    /// Raw position string from the feed (e.g., "QB", "WR", "EDGE").
    pub position: String,
    pub status: InjuryStatus,
    /// Free-text injury description (e.g., "left hamstring strain").
    pub description: String,
    pub reported_on: NaiveDate,
}

/// A market line snapshot from an odds feed. Read-only input.
///
/// Spread convention: `spread` is the home team's handicap as the book
/// quotes it (negative = home favored by that many points).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketLine {
    pub game_id: String,
    pub league: League,
    pub home_team: String,
    pub away_team: String,
    pub spread: Option<f64>,
    pub total: Option<f64>,
    /// American odds for the home/away moneyline (e.g., -150, +130).
    pub moneyline_home: Option<i32>,
    pub moneyline_away: Option<i32>,
    pub observed_at: DateTime<Utc>,
    pub source: String,
}

/// Precipitation type attached to a weather observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Precipitation {
    #[default]
    None,
    Rain,
    Snow,
}

/// Forecast/observation for a venue at game time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub venue: String,
    pub game_time: DateTime<Utc>,
    pub temperature_f: f64,
    pub wind_mph: f64,
    /// Probability of precipitation, 0.0 to 1.0.
    pub precipitation_chance: f64,
    pub precipitation: Precipitation,
    /// Indoor/dome venues suppress all weather adjustments.
    pub is_dome: bool,
}

/// Per-side schedule context for a matchup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamSchedule {
    pub rest_days: u8,
    pub off_bye: bool,
    pub short_week: bool,
    /// Time zones crossed travelling to the venue.
    pub timezones_crossed: u8,
}

/// Everything the situational model needs to know about one matchup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchupContext {
    pub league: League,
    pub week: u16,
    pub home_team: String,
    pub away_team: String,
    pub home_schedule: TeamSchedule,
    pub away_schedule: TeamSchedule,
    pub divisional: bool,
    pub rivalry: bool,
    pub weather: Option<WeatherObservation>,
    /// Starting quarterbacks, when known. Used only for per-player
    /// weather overlays; absence yields no modifier.
    pub home_qb: Option<String>,
    pub away_qb: Option<String>,
}

// ============================================================================
// Team Ratings
// ============================================================================

/// One team's power rating for one week. Append-only: once a later week
/// has been derived from this record it is never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRating {
    pub team: String,
    pub league: League,
    pub week: u16,
    pub rating: f64,
    pub offense: f64,
    pub defense: f64,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Injury Impact (derived)
// ============================================================================

/// Point impact of a single injured player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryImpact {
    pub player: String,
    pub position: String,
    /// Full point value of the player when healthy.
    pub base_value: f64,
    /// Fraction of base value the player still contributes, 0.0 to 1.0.
    pub capacity: f64,
    /// `base_value * (1 - capacity)`, never negative, capped at base_value.
    pub point_impact: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Major => "major",
            Severity::Critical => "critical",
        }
    }
}

/// How complete the underlying injury data was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataConfidence {
    Low,
    Medium,
    High,
}

/// Summed injury impact for one team in one week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamInjuryImpact {
    pub team: String,
    pub week: u16,
    pub total_points: f64,
    pub severity: Severity,
    pub confidence: DataConfidence,
    pub players: Vec<InjuryImpact>,
}

// ============================================================================
// Projections
// ============================================================================

/// One labeled term contributing to a projection or adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentTerm {
    pub label: String,
    /// Delta in home-margin space (positive helps the home side).
    pub spread_delta: f64,
    pub total_delta: f64,
}

impl AdjustmentTerm {
    pub fn spread(label: impl Into<String>, delta: f64) -> Self {
        Self {
            label: label.into(),
            spread_delta: delta,
            total_delta: 0.0,
        }
    }

    pub fn total(label: impl Into<String>, delta: f64) -> Self {
        Self {
            label: label.into(),
            spread_delta: 0.0,
            total_delta: delta,
        }
    }
}

/// Projected line for an upcoming game.
///
/// `home_margin` is the projected winning margin for the home team
/// (positive = home favored). `spread` is the same number quoted the way
/// a book would (home handicap, negative = home favored).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameProjection {
    pub game_id: String,
    pub league: League,
    pub week: u16,
    pub home_team: String,
    pub away_team: String,
    pub home_margin: f64,
    pub spread: f64,
    pub total: f64,
    /// Probability the home team wins, derived from the projected margin.
    pub home_win_prob: f64,
    pub breakdown: Vec<AdjustmentTerm>,
}

/// An upcoming game queued for projection: matchup context plus the
/// current-week injury picture for both sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingGame {
    pub game_id: String,
    pub context: MatchupContext,
    pub home_injuries: Option<TeamInjuryImpact>,
    pub away_injuries: Option<TeamInjuryImpact>,
}

// ============================================================================
// Edge Detection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    Spread,
    Total,
    Moneyline,
}

impl MarketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketKind::Spread => "spread",
            MarketKind::Total => "total",
            MarketKind::Moneyline => "moneyline",
        }
    }
}

/// Confidence tier for a detected edge, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    NoPlay,
    Lean,
    Moderate,
    Strong,
    Prime,
}

impl ConfidenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::NoPlay => "no_play",
            ConfidenceTier::Lean => "lean",
            ConfidenceTier::Moderate => "moderate",
            ConfidenceTier::Strong => "strong",
            ConfidenceTier::Prime => "prime",
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self, ConfidenceTier::NoPlay)
    }
}

/// Key-number stake adjustment applied on top of the base tier. Kept as a
/// separate labeled term so it is auditable and never folded into tier
/// selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyNumberAdjustment {
    pub key_number: f64,
    pub multiplier: f64,
    pub label: String,
}

/// Result of comparing one projected market against the posted line.
/// History is retained: a new market snapshot produces a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeResult {
    pub game_id: String,
    pub league: League,
    pub market: MarketKind,
    pub projected: f64,
    pub market_value: f64,
    /// `projected - market_value`, signed. For spreads both values are in
    /// book convention so the sign identifies the side with value.
    pub edge: f64,
    pub tier: ConfidenceTier,
    /// Kelly fraction for the tier, before key-number adjustment.
    pub kelly_fraction: f64,
    /// Recommended stake fraction after key-number adjustment.
    pub stake_fraction: f64,
    /// Historical win-rate label for display only, never recomputed from.
    pub win_rate_label: String,
    pub key_number_adjustment: Option<KeyNumberAdjustment>,
    pub breakdown: Vec<AdjustmentTerm>,
    pub detected_at: DateTime<Utc>,
}

// ============================================================================
// Closing Line Value
// ============================================================================

/// Side of a bet, used to normalize CLV sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetSide {
    Home,
    Away,
    Over,
    Under,
}

/// One logged bet with its entry and closing numbers.
///
/// Spread lines are stored in side-margin convention: the number of
/// points the bet side is expected to win by (negative = underdog).
/// Totals store the posted total. The closing line is written exactly
/// once; the record is immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClvRecord {
    pub bet_id: Uuid,
    pub game_id: String,
    pub league: League,
    pub side: BetSide,
    pub entry_line: f64,
    pub closing_line: Option<f64>,
    pub entered_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl ClvRecord {
    /// Signed CLV in points: positive always means the bettor got the
    /// better number. The market moving toward the side taken after
    /// entry means the earlier number was the cheaper one.
    pub fn clv_points(&self) -> Option<f64> {
        let closing = self.closing_line?;
        let raw = closing - self.entry_line;
        Some(match self.side {
            BetSide::Home | BetSide::Away | BetSide::Over => raw,
            BetSide::Under => -raw,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closing_line.is_some()
    }
}

// ============================================================================
// Weekly Batch Reporting
// ============================================================================

/// Why a game was skipped during a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedGame {
    pub game_id: String,
    pub reason: String,
}

/// Outcome of one weekly batch operation. Skipped games are reported,
/// never silently omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeekReport {
    pub processed: usize,
    pub skipped: Vec<SkippedGame>,
}

impl WeekReport {
    pub fn skip(&mut self, game_id: &str, reason: impl Into<String>) {
        self.skipped.push(SkippedGame {
            game_id: game_id.to_string(),
            reason: reason.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_home_net_score() {
        let result = GameResult {
            game_id: "g1".to_string(),
            league: League::NFL,
            week: 3,
            home_team: "GB".to_string(),
            away_team: "CHI".to_string(),
            home_score: 27,
            away_score: 20,
        };
        assert_eq!(result.home_net_score(), 7.0);
        assert_eq!(result.away_net_score(), -7.0);
    }

    #[test]
    fn test_clv_sign_normalization() {
        // Away side: entered at +3.0, market closed at +5.5 on the same
        // side -> the market moved toward the bet, CLV +2.5.
        let mut record = ClvRecord {
            bet_id: Uuid::new_v4(),
            game_id: "g1".to_string(),
            league: League::NFL,
            side: BetSide::Away,
            entry_line: 3.0,
            closing_line: Some(5.5),
            entered_at: Utc::now(),
            closed_at: Some(Utc::now()),
        };
        assert_eq!(record.clv_points(), Some(2.5));

        // Under bets flip: total dropping from 44.5 to 41.0 is +3.5 for
        // an under bettor.
        record.side = BetSide::Under;
        record.entry_line = 44.5;
        record.closing_line = Some(41.0);
        assert_eq!(record.clv_points(), Some(3.5));
    }

    #[test]
    fn test_in_flight_record_has_no_clv() {
        let record = ClvRecord {
            bet_id: Uuid::new_v4(),
            game_id: "g1".to_string(),
            league: League::NBA,
            side: BetSide::Home,
            entry_line: -4.0,
            closing_line: None,
            entered_at: Utc::now(),
            closed_at: None,
        };
        assert!(!record.is_closed());
        assert_eq!(record.clv_points(), None);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(ConfidenceTier::Prime > ConfidenceTier::Strong);
        assert!(ConfidenceTier::Lean > ConfidenceTier::NoPlay);
        assert!(!ConfidenceTier::NoPlay.is_actionable());
        assert!(ConfidenceTier::Lean.is_actionable());
    }
}
