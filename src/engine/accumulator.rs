use hashbrown::HashMap;

use crate::core::roster::Roster;
use crate::op::WriteOp;
use crate::types::{MatchId, PlayerId, Quarter, Team};

/// One pool-time leaderboard row for the display sink.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow {
    pub player: PlayerId,
    pub label: String,
    pub pool_seconds: f64,
    pub substitutions: u32,
}

/// In-memory possession/pool accumulation, mirrored durably through
/// [`WriteOp`]s on every tick. Durable rows stay the source of truth for
/// resume; this map exists for live queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    pool: HashMap<PlayerId, HashMap<Quarter, f64>>,
    possession: HashMap<PlayerId, HashMap<Quarter, f64>>,
    subs: HashMap<PlayerId, HashMap<Quarter, u32>>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distributes one elapsed window over the pre-tick snapshot: `dt` pool
    /// seconds to every in-pool player and `dt` possession seconds to the
    /// holder, pushing the matching durable upserts.
    pub fn apply_tick(
        &mut self,
        match_id: MatchId,
        dt: f64,
        in_pool: impl Iterator<Item = PlayerId>,
        ball_holder: Option<PlayerId>,
        quarter: Quarter,
        out: &mut Vec<WriteOp>,
    ) {
        for player in in_pool {
            *self
                .pool
                .entry(player)
                .or_default()
                .entry(quarter)
                .or_insert(0.0) += dt;
            out.push(WriteOp::AddPoolTime {
                match_id,
                player,
                quarter,
                delta: dt,
            });
        }

        if let Some(holder) = ball_holder {
            *self
                .possession
                .entry(holder)
                .or_default()
                .entry(quarter)
                .or_insert(0.0) += dt;
            out.push(WriteOp::AddPossession {
                match_id,
                player: holder,
                quarter,
                delta: dt,
            });
        }
    }

    pub fn note_substitution(&mut self, player: PlayerId, quarter: Quarter) {
        *self
            .subs
            .entry(player)
            .or_default()
            .entry(quarter)
            .or_insert(0) += 1;
    }

    /// Ensures zero-valued pool entries exist for every tracked player in
    /// `quarter`.
    pub fn seed_quarter(&mut self, quarter: Quarter) {
        for quarters in self.pool.values_mut() {
            quarters.entry(quarter).or_insert(0.0);
        }
    }

    /// Players with any pool-time history.
    pub fn tracked_players(&self) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self.pool.keys().copied().collect();
        players.sort_by_key(|p| (p.team == Team::Away, p.slot));
        players
    }

    pub fn pool_seconds(&self, player: PlayerId, quarter: Quarter) -> f64 {
        self.pool
            .get(&player)
            .and_then(|q| q.get(&quarter))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn possession_seconds(&self, player: PlayerId, quarter: Quarter) -> f64 {
        self.possession
            .get(&player)
            .and_then(|q| q.get(&quarter))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn substitutions(&self, player: PlayerId, quarter: Quarter) -> u32 {
        self.subs
            .get(&player)
            .and_then(|q| q.get(&quarter))
            .copied()
            .unwrap_or(0)
    }

    /// Top `limit` pool times for a quarter, labels truncated to 10 chars.
    pub fn leaderboard(&self, quarter: Quarter, roster: &Roster, limit: usize) -> Vec<LeaderboardRow> {
        let mut rows: Vec<LeaderboardRow> = self
            .pool
            .iter()
            .filter_map(|(player, quarters)| {
                let secs = *quarters.get(&quarter)?;
                let label: String = roster.display_name(*player).chars().take(10).collect();
                Some(LeaderboardRow {
                    player: *player,
                    label,
                    pool_seconds: secs,
                    substitutions: self.substitutions(*player, quarter),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.pool_seconds
                .partial_cmp(&a.pool_seconds)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.player.slot.cmp(&b.player.slot))
        });
        rows.truncate(limit);
        rows
    }

    pub(crate) fn restore_pool(&mut self, player: PlayerId, quarter: Quarter, secs: f64, subs: u32) {
        self.pool.entry(player).or_default().insert(quarter, secs);
        if subs > 0 {
            self.subs.entry(player).or_default().insert(quarter, subs);
        }
    }

    pub(crate) fn restore_possession(&mut self, player: PlayerId, quarter: Quarter, secs: f64) {
        self.possession
            .entry(player)
            .or_default()
            .insert(quarter, secs);
    }
}
