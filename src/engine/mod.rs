//! Possession/pool accumulation and live event statistics.

/// Possession and pool-time accumulation plus the leaderboard projection.
pub mod accumulator;
/// Event counters, score, critical log, and quarter summaries.
pub mod stats;
