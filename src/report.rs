//! Read-only report rows assembled from stored match data.

use serde::{Deserialize, Serialize};

use crate::types::{EventType, MatchId, PlayerId};

/// Metric columns shown in the player breakdown, in display order.
pub const BREAKDOWN_METRICS: [EventType; 9] = [
    EventType::Goal,
    EventType::Shot,
    EventType::PenWin,
    EventType::ExclWin,
    EventType::Foul,
    EventType::PLost,
    EventType::ELost,
    EventType::Block,
    EventType::Save,
];

/// Whole-match report: goals per team, event counts, top scorers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Reported match.
    pub match_id: MatchId,
    /// Home team name.
    pub home_team: String,
    /// Away team name.
    pub away_team: String,
    /// Final score text, empty if never set.
    pub final_score: String,
    /// Goals recorded for the home side.
    pub home_goals: u32,
    /// Goals recorded for the away side.
    pub away_goals: u32,
    /// Event counts by type, most frequent first.
    pub event_counts: Vec<(EventType, u32)>,
    /// Top scorers by goals, at most ten.
    pub top_scorers: Vec<(PlayerId, u32)>,
}

/// Per-player event counts over [`BREAKDOWN_METRICS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerBreakdownRow {
    /// Player.
    pub player: PlayerId,
    /// Non-zero metric counts, in [`BREAKDOWN_METRICS`] order.
    pub counts: Vec<(EventType, u32)>,
}
