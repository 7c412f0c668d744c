use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Local;
use thiserror::Error;

use crate::core::clock::{MatchClock, QuarterRollover, TickResult};
use crate::core::roster::{Lineup, Roster};
use crate::engine::accumulator::{Accumulator, LeaderboardRow};
use crate::engine::stats::{StatBook, StatRow};
use crate::logbook::{LogEntry, SummaryLine};
use crate::op::WriteOp;
use crate::record::{CriticalEvent, EventRecord, MatchRecord, SubstitutionRecord};
use crate::types::{
    EventClass, EventId, EventType, MatchId, PlayerId, Quarter, SubAction, Subject, Team,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("no active match; create one first")]
    NoActiveMatch,
    #[error("match is finished; start a new match")]
    MatchFinished,
    #[error("clock is running; pause it first")]
    ClockRunning,
    #[error("{player} is already in the pool")]
    AlreadyInPool { player: PlayerId },
    #[error("{player} is not in the pool")]
    NotInPool { player: PlayerId },
    #[error("select a ball holder first")]
    MissingBallHolder,
    #[error("roster slot {slot} is out of range")]
    InvalidSlot { slot: u8 },
    #[error("substitution mode is armed; select the player first")]
    SubModeArmed,
    #[error("roster incomplete: {missing} unnamed slots")]
    RosterIncomplete { missing: usize },
    #[error("quarter advance past Q4 is disabled")]
    RolloverRejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub quarter_len_secs: f64,
    pub rollover: QuarterRollover,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            quarter_len_secs: 480.0,
            rollover: QuarterRollover::WrapToFirst,
        }
    }
}

/// Player-selection dispatch state. One-shot: every selection resolves the
/// current state and resets it to `Idle`, whether or not it succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Idle,
    AwaitingDefender(EventType),
    AwaitingSubTarget(SubAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selected {
    BallHolder(PlayerId),
    SubApplied { player: PlayerId, action: SubAction },
    DefensiveRecorded { player: PlayerId, event_type: EventType },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Triggered {
    Recorded { subject: Subject, event_type: EventType },
    AwaitingDefender(EventType),
}

/// All state of one match session: clock, lineup, selection machine, ball
/// possession, stat book, and time accumulation. Mutations append to the
/// pending write/log queues, drained by the runtime after every command.
#[derive(Debug)]
pub struct MatchSession {
    config: SessionConfig,
    match_id: MatchId,
    match_code: String,
    home_team: String,
    away_team: String,
    clock: MatchClock,
    roster: Roster,
    lineup: Lineup,
    selection: Selection,
    possession_team: Team,
    ball_holder: Option<PlayerId>,
    stats: StatBook,
    accumulator: Accumulator,
    next_event_id: EventId,
    pending_writes: Vec<WriteOp>,
    pending_log: Vec<LogEntry>,
}

impl MatchSession {
    pub fn open(
        match_id: MatchId,
        next_event_id: EventId,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        roster: Roster,
        config: SessionConfig,
    ) -> Self {
        let home_team = home_team.into();
        let away_team = away_team.into();
        let now = Local::now();
        let match_code = now.format("%Y%m%d_%H%M%S").to_string();
        let date = now.format("%Y-%m-%d %H:%M").to_string();

        let rec = MatchRecord {
            match_id,
            match_code: match_code.clone(),
            date: date.clone(),
            home_team: home_team.clone(),
            away_team: away_team.clone(),
            final_score: String::new(),
        };

        let mut session = Self {
            clock: MatchClock::new(config.quarter_len_secs),
            config,
            match_id,
            match_code,
            home_team,
            away_team,
            roster,
            lineup: Lineup::new(),
            selection: Selection::Idle,
            possession_team: Team::Home,
            ball_holder: None,
            stats: StatBook::new(),
            accumulator: Accumulator::new(),
            next_event_id,
            pending_writes: Vec::new(),
            pending_log: Vec::new(),
        };
        session.pending_writes.push(WriteOp::InsertMatch { rec });
        session.pending_log.push(LogEntry::Header {
            home_team: session.home_team.clone(),
            away_team: session.away_team.clone(),
            date,
        });
        tracing::info!(match_code = %session.match_code, "match opened");
        session
    }

    pub fn start_clock(&mut self) -> Result<(), EngineError> {
        if self.clock.is_finished() {
            return Err(EngineError::MatchFinished);
        }
        if self.clock.is_running() {
            return Ok(());
        }
        self.lineup.capture_starting_once();
        self.clock.start();
        Ok(())
    }

    pub fn pause_clock(&mut self) {
        self.clock.pause();
    }

    pub fn reset_quarter(&mut self) -> Result<(), EngineError> {
        if self.clock.is_finished() {
            return Err(EngineError::MatchFinished);
        }
        self.clock.reset();
        Ok(())
    }

    pub fn adjust_time(&mut self, delta: f64) -> Result<(), EngineError> {
        if self.clock.is_finished() {
            return Err(EngineError::MatchFinished);
        }
        self.clock.adjust(delta);
        Ok(())
    }

    pub fn advance_quarter(&mut self) -> Result<Quarter, EngineError> {
        if self.clock.is_finished() {
            return Err(EngineError::MatchFinished);
        }
        if self.clock.is_running() {
            return Err(EngineError::ClockRunning);
        }
        let quarter = self
            .clock
            .advance_quarter(self.config.rollover)
            .map_err(|_| EngineError::RolloverRejected)?;

        // Seed the new quarter for the starting lineup when one was
        // captured, otherwise for every player with pool-time history.
        let mut players = self.lineup.starting().to_vec();
        if players.is_empty() {
            players = self.accumulator.tracked_players();
        }
        self.seed_quarter(players, quarter);
        Ok(quarter)
    }

    pub fn arm_sub(&mut self, action: SubAction) {
        self.selection = Selection::AwaitingSubTarget(action);
    }

    pub fn select_player(&mut self, team: Team, slot: u8) -> Result<Selected, EngineError> {
        let selection = std::mem::take(&mut self.selection);
        let player = PlayerId::new(team, slot).ok_or(EngineError::InvalidSlot { slot })?;

        match selection {
            Selection::AwaitingSubTarget(action) => {
                self.apply_sub(player, action)?;
                Ok(Selected::SubApplied { player, action })
            }
            Selection::AwaitingDefender(event_type) => {
                self.record_event(Subject::Player(player), event_type);
                self.ball_holder = None;
                Ok(Selected::DefensiveRecorded { player, event_type })
            }
            Selection::Idle => {
                if !self.lineup.contains(player) {
                    return Err(EngineError::NotInPool { player });
                }
                self.ball_holder = Some(player);
                self.possession_team = team;
                Ok(Selected::BallHolder(player))
            }
        }
    }

    pub fn trigger_event(&mut self, event_type: EventType) -> Result<Triggered, EngineError> {
        match event_type.class() {
            EventClass::Defense => {
                if matches!(self.selection, Selection::AwaitingSubTarget(_)) {
                    return Err(EngineError::SubModeArmed);
                }
                self.selection = Selection::AwaitingDefender(event_type);
                Ok(Triggered::AwaitingDefender(event_type))
            }
            EventClass::Game => {
                self.record_event(Subject::Game, event_type);
                Ok(Triggered::Recorded {
                    subject: Subject::Game,
                    event_type,
                })
            }
            EventClass::Offense => {
                let holder = self.ball_holder.ok_or(EngineError::MissingBallHolder)?;
                let subject = Subject::Player(holder);
                self.record_event(subject, event_type);
                Ok(Triggered::Recorded { subject, event_type })
            }
        }
    }

    /// Consumes one elapsed wall-clock window: distributes it over the
    /// pre-tick in-pool/holder snapshot, then decrements the clock and
    /// handles quarter expiry.
    pub fn tick(&mut self, dt: f64) -> TickResult {
        self.accumulator.apply_tick(
            self.match_id,
            dt,
            self.lineup.iter(),
            self.ball_holder,
            self.clock.quarter(),
            &mut self.pending_writes,
        );

        let result = self.clock.tick(dt);
        match result {
            TickResult::Ticking => {}
            TickResult::QuarterEnded(ended) => {
                self.push_quarter_summary(ended);
                let next = self.clock.quarter();
                self.seed_quarter(self.accumulator.tracked_players(), next);
                tracing::info!(quarter = ended, "quarter ended");
            }
            TickResult::MatchFinished => {
                self.push_quarter_summary(crate::types::QUARTERS_PER_MATCH);
                tracing::info!("match finished");
            }
        }
        result
    }

    pub fn drain_writes(&mut self) -> Vec<WriteOp> {
        std::mem::take(&mut self.pending_writes)
    }

    pub fn drain_log(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.pending_log)
    }

    pub fn set_roster(&mut self, roster: Roster) {
        self.roster = roster;
    }

    pub fn match_id(&self) -> MatchId {
        self.match_id
    }

    pub fn match_code(&self) -> &str {
        &self.match_code
    }

    pub fn home_team(&self) -> &str {
        &self.home_team
    }

    pub fn away_team(&self) -> &str {
        &self.away_team
    }

    pub fn clock(&self) -> &MatchClock {
        &self.clock
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn possession_team(&self) -> Team {
        self.possession_team
    }

    pub fn ball_holder(&self) -> Option<PlayerId> {
        self.ball_holder
    }

    pub fn ball_holder_label(&self) -> String {
        match self.ball_holder {
            Some(holder) => self.roster.display_name(holder),
            None => "No ball".to_string(),
        }
    }

    pub fn score(&self) -> (u32, u32) {
        self.stats.score()
    }

    pub fn stats(&self) -> &StatBook {
        &self.stats
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    pub fn in_pool(&self, team: Team) -> Vec<PlayerId> {
        self.lineup.team_players(team)
    }

    pub fn live_stats(&self) -> Vec<StatRow> {
        self.stats.live_stats(&self.roster, 10)
    }

    pub fn critical_log(&self) -> Vec<CriticalEvent> {
        self.stats.critical_events()
    }

    pub fn pool_leaderboard(&self) -> Vec<LeaderboardRow> {
        self.accumulator
            .leaderboard(self.clock.quarter(), &self.roster, 8)
    }

    pub fn next_event_id(&self) -> EventId {
        self.next_event_id
    }

    fn apply_sub(&mut self, player: PlayerId, action: SubAction) -> Result<(), EngineError> {
        match action {
            SubAction::In => {
                if self.lineup.contains(player) {
                    return Err(EngineError::AlreadyInPool { player });
                }
                self.log_sub(player, action);
                self.lineup.insert(player);
            }
            SubAction::Out => {
                if !self.lineup.contains(player) {
                    return Err(EngineError::NotInPool { player });
                }
                self.log_sub(player, action);
                self.lineup.remove(player);
                if self.ball_holder == Some(player) {
                    // Possession stays with the same team when a teammate
                    // remains, else it is lost entirely.
                    self.ball_holder = self.lineup.teammate_of(player.team, player);
                }
            }
        }
        Ok(())
    }

    fn log_sub(&mut self, player: PlayerId, action: SubAction) {
        let quarter = self.clock.quarter();
        self.accumulator.note_substitution(player, quarter);
        self.pending_writes.push(WriteOp::AppendSubstitution {
            rec: SubstitutionRecord {
                match_id: self.match_id,
                player,
                quarter,
                time_remaining: self.clock.time_remaining(),
                action,
                ts: now_ts(),
            },
        });
    }

    fn record_event(&mut self, subject: Subject, event_type: EventType) {
        let quarter = self.clock.quarter();
        let time_remaining = self.clock.time_remaining();

        // The durable record carries the pre-effect snapshot.
        let rec = EventRecord {
            event_id: self.next_event_id,
            match_id: self.match_id,
            match_code: self.match_code.clone(),
            subject,
            event_type,
            quarter,
            time_remaining,
            ts: now_ts(),
            possession_team: self.possession_team,
            ball_holder: self.ball_holder,
        };
        self.next_event_id += 1;

        self.stats.record(subject, event_type, quarter, time_remaining);

        if event_type == EventType::Goal {
            self.ball_holder = None;
        }

        if event_type.auto_pauses() && self.clock.is_running() {
            self.clock.auto_pause();
        }

        self.pending_log.push(LogEntry::Event {
            time_remaining,
            quarter,
            team: self.possession_team,
            label: self.roster.label(subject),
            event_type,
        });
        self.pending_writes.push(WriteOp::AppendEvent { rec });
    }

    fn seed_quarter(&mut self, players: Vec<PlayerId>, quarter: Quarter) {
        self.accumulator.seed_quarter(quarter);
        if !players.is_empty() {
            self.pending_writes.push(WriteOp::SeedQuarter {
                match_id: self.match_id,
                players,
                quarter,
            });
        }
    }

    fn push_quarter_summary(&mut self, quarter: Quarter) {
        let Some(summary) = self.stats.quarter_summary(quarter) else {
            return;
        };
        let lines = summary
            .entries
            .iter()
            .map(|e| SummaryLine {
                time_str: e.time_str(),
                label: self.roster.label(e.subject),
                event_type: e.event_type,
            })
            .collect();
        self.pending_log.push(LogEntry::Summary {
            quarter: summary.quarter,
            total: summary.total,
            home: summary.home,
            away: summary.away,
            top: summary.top,
            lines,
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        config: SessionConfig,
        rec: MatchRecord,
        roster: Roster,
        lineup: Lineup,
        possession_team: Team,
        stats: StatBook,
        accumulator: Accumulator,
        clock: MatchClock,
        next_event_id: EventId,
    ) -> Self {
        Self {
            config,
            match_id: rec.match_id,
            match_code: rec.match_code,
            home_team: rec.home_team,
            away_team: rec.away_team,
            clock,
            roster,
            lineup,
            selection: Selection::Idle,
            possession_team,
            ball_holder: None,
            stats,
            accumulator,
            next_event_id,
            pending_writes: Vec::new(),
            pending_log: Vec::new(),
        }
    }
}

fn now_ts() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
