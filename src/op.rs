//! Write operations applied to the persistence sink.

use crate::record::{EventRecord, MatchRecord, PlayerRecord, SubstitutionRecord};
use crate::types::{MatchId, PlayerId, Quarter};

/// Closed set of mutations the engine performs against durable storage.
///
/// All ops produced by one command or one clock tick are applied in a single
/// transaction, so a tick's pool and possession deltas commit together.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create a match row.
    InsertMatch {
        /// New match.
        rec: MatchRecord,
    },
    /// Replace the whole player table with the named entries.
    ReplaceRoster {
        /// Named slots to keep.
        players: Vec<PlayerRecord>,
    },
    /// Append one event row.
    AppendEvent {
        /// Recorded event.
        rec: EventRecord,
    },
    /// Add pool seconds to a player/quarter row, preserving its
    /// substitution counter. Creates the row if absent.
    AddPoolTime {
        /// Owning match.
        match_id: MatchId,
        /// Player.
        player: PlayerId,
        /// Quarter.
        quarter: Quarter,
        /// Elapsed seconds to add.
        delta: f64,
    },
    /// Add possession seconds to a player/quarter row. Creates the row if
    /// absent.
    AddPossession {
        /// Owning match.
        match_id: MatchId,
        /// Player.
        player: PlayerId,
        /// Quarter.
        quarter: Quarter,
        /// Elapsed seconds to add.
        delta: f64,
    },
    /// Append a substitution row and bump the player's per-quarter
    /// substitution counter, preserving accumulated pool seconds.
    AppendSubstitution {
        /// Substitution entry.
        rec: SubstitutionRecord,
    },
    /// Seed zero-valued pool and possession rows for a quarter, leaving any
    /// existing rows untouched.
    SeedQuarter {
        /// Owning match.
        match_id: MatchId,
        /// Players to seed.
        players: Vec<PlayerId>,
        /// Quarter to seed.
        quarter: Quarter,
    },
}
