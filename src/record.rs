//! Durable match-domain records.

use serde::{Deserialize, Serialize};

use crate::types::{EventId, EventType, MatchId, PlayerId, Quarter, SubAction, Subject, Team, mmss};

/// One match session. Immutable once created except `final_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Stable match identifier.
    pub match_id: MatchId,
    /// Time-derived unique code, e.g. `20260314_193004`.
    pub match_code: String,
    /// Match date, `YYYY-MM-DD HH:MM`.
    pub date: String,
    /// Home team name.
    pub home_team: String,
    /// Away team name.
    pub away_team: String,
    /// Final score text; empty until set at completion.
    pub final_score: String,
}

/// A named roster slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Slot identity.
    pub player: PlayerId,
    /// Cap number.
    pub number: u32,
    /// Player name.
    pub name: String,
}

/// Input row for the bulk names-edit operation. An empty name clears the slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Slot identity.
    pub player: PlayerId,
    /// Cap number.
    pub number: u32,
    /// Player name; empty leaves the slot unnamed.
    pub name: String,
}

/// One discrete game event. Append-only; never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Stable event identifier.
    pub event_id: EventId,
    /// Owning match.
    pub match_id: MatchId,
    /// Owning match code.
    pub match_code: String,
    /// Event subject: a player or the `GAME` sentinel.
    pub subject: Subject,
    /// Event type.
    pub event_type: EventType,
    /// Quarter in which the event occurred.
    pub quarter: Quarter,
    /// Clock seconds remaining when recorded.
    pub time_remaining: f64,
    /// Wall-clock timestamp, epoch seconds.
    pub ts: f64,
    /// Team credited with possession at the time.
    pub possession_team: Team,
    /// Ball holder at the time, if any.
    pub ball_holder: Option<PlayerId>,
}

/// One substitution log row. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionRecord {
    /// Owning match.
    pub match_id: MatchId,
    /// Substituted player.
    pub player: PlayerId,
    /// Quarter of the substitution.
    pub quarter: Quarter,
    /// Clock seconds remaining when recorded.
    pub time_remaining: f64,
    /// Direction.
    pub action: SubAction,
    /// Wall-clock timestamp, epoch seconds.
    pub ts: f64,
}

/// Accumulated pool time for one player in one quarter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolTimeRow {
    /// Owning match.
    pub match_id: MatchId,
    /// Player.
    pub player: PlayerId,
    /// Quarter.
    pub quarter: Quarter,
    /// Monotonically increasing pool seconds.
    pub pool_seconds: f64,
    /// Substitutions counted in this quarter.
    pub substitutions: u32,
}

/// Accumulated possession time for one player in one quarter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PossessionRow {
    /// Owning match.
    pub match_id: MatchId,
    /// Player.
    pub player: PlayerId,
    /// Quarter.
    pub quarter: Quarter,
    /// Monotonically increasing possession seconds.
    pub possession_seconds: f64,
}

/// In-memory critical-event entry, kept for quarter summaries and the
/// dedicated log view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalEvent {
    /// Quarter of the event.
    pub quarter: Quarter,
    /// Clock seconds remaining when recorded.
    pub time_remaining: f64,
    /// Event subject.
    pub subject: Subject,
    /// Event type.
    pub event_type: EventType,
}

impl CriticalEvent {
    /// Clock display text, `m:ss`.
    pub fn time_str(&self) -> String {
        mmss(self.time_remaining)
    }
}
