//! Display/notification stream payloads.

use crate::engine::accumulator::LeaderboardRow;
use crate::types::{EventType, MatchId, PlayerId, Quarter, SubAction, Subject, Team};

/// Events emitted from the single-writer runtime loop for display surfaces.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// A new match session was opened.
    MatchOpened {
        /// New match id.
        match_id: MatchId,
        /// New match code.
        match_code: String,
    },
    /// Clock state changed (tick, start, pause, adjust, quarter roll).
    ClockChanged {
        /// Seconds remaining in the quarter.
        time_remaining: f64,
        /// Current quarter.
        quarter: Quarter,
        /// True while ticking.
        running: bool,
        /// True when the last stop was automatic.
        auto_paused: bool,
        /// Preformatted clock text.
        text: String,
    },
    /// Score changed or was reset.
    ScoreChanged {
        /// Home goals.
        home: u32,
        /// Away goals.
        away: u32,
    },
    /// Ball possession changed.
    BallChanged {
        /// New holder, if any.
        holder: Option<PlayerId>,
        /// Team credited with possession.
        team: Team,
    },
    /// A game event was recorded.
    EventRecorded {
        /// Event subject.
        subject: Subject,
        /// Event type.
        event_type: EventType,
        /// Quarter of the event.
        quarter: Quarter,
    },
    /// A substitution was applied.
    SubstitutionApplied {
        /// Substituted player.
        player: PlayerId,
        /// Direction.
        action: SubAction,
        /// Quarter of the substitution.
        quarter: Quarter,
    },
    /// A quarter expired while the clock was running.
    QuarterEnded {
        /// The quarter that ended.
        quarter: Quarter,
    },
    /// Quarter 4 expired; the match is in its terminal state.
    MatchFinished,
    /// Pool-time leaderboard for the current quarter.
    PoolTimes {
        /// Top rows, longest pool time first.
        rows: Vec<LeaderboardRow>,
    },
    /// A durable write failed; the clock was paused.
    PersistFailed {
        /// Failure description.
        message: String,
    },
}
