//! Engine error taxonomy.
//!
//! Hard failures are reserved for conditions that would corrupt the
//! append-only history or the CLV ground truth: missing required inputs,
//! out-of-range values at ingestion, out-of-order week advancement, and
//! duplicate mutations. Unrecognized categorical values (unknown injury
//! type, unknown position) are not errors; they resolve to documented
//! fallbacks and log a warning.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A required input is absent for a single game/record. The caller
    /// reports and skips; the rest of the batch proceeds.
    #[error("missing required input for {game_id}: {what}")]
    MissingInput { game_id: String, what: &'static str },

    /// A numeric input failed range validation at ingestion. Rejected,
    /// never clamped: bad inputs would corrupt the rating history.
    #[error("{field} out of range for {context}: {value}")]
    OutOfRange {
        context: String,
        field: &'static str,
        value: f64,
    },

    /// A team's rating can only be advanced from the immediately
    /// preceding week.
    #[error("cannot advance {team} to week {requested}: latest rating is week {latest}")]
    OutOfOrderWeek {
        team: String,
        latest: u16,
        requested: u16,
    },

    /// Exactly one rating may exist per (team, league, week).
    #[error("rating already recorded for {team} week {week}")]
    DuplicateWeek { team: String, week: u16 },

    /// The team has no seeded rating to advance from.
    #[error("no rating history for {team} ({league})")]
    UnseededTeam { team: String, league: String },

    /// A bet id may be entered once.
    #[error("bet {bet_id} already recorded")]
    DuplicateBet { bet_id: Uuid },

    /// The closing line is written exactly once per bet.
    #[error("closing line already recorded for bet {bet_id}")]
    DuplicateClose { bet_id: Uuid },

    #[error("unknown bet id {bet_id}")]
    UnknownBet { bet_id: Uuid },

    /// A record failed structural validation at ingestion.
    #[error("invalid {context}: {reason}")]
    InvalidRecord { context: String, reason: String },

    #[error("no league parameters configured for {0}")]
    UnknownLeague(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
