use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio::time::{Duration, Instant};

use crate::core::clock::TickResult;
use crate::core::roster::Roster;
use crate::core::session::{
    EngineError, MatchSession, Selected, SessionConfig, Triggered,
};
use crate::engine::accumulator::LeaderboardRow;
use crate::engine::stats::StatRow;
use crate::logbook::MatchLogWriter;
use crate::op::WriteOp;
use crate::persist::{MatchSink, PersistError, PersistResult, sqlite::SqliteMatchSink};
use crate::record::{CriticalEvent, RosterEntry};
use crate::types::{EventId, EventType, MatchId, Quarter, SubAction, Subject, Team};

use super::events::TrackerEvent;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("runtime channel closed")]
    ChannelClosed,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub tick_interval: Duration,
    pub require_full_roster: bool,
    pub log_dir: Option<PathBuf>,
    pub session: SessionConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            require_full_roster: true,
            log_dir: None,
            session: SessionConfig::default(),
        }
    }
}

/// State owned by the runtime loop: roster names, the active session, and
/// the durable id counters.
pub struct TrackerState {
    pub roster: Roster,
    pub session: Option<MatchSession>,
    pub next_match_id: MatchId,
    pub next_event_id: EventId,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackerState {
    pub fn new() -> Self {
        Self {
            roster: Roster::new(),
            session: None,
            next_match_id: 1,
            next_event_id: 1,
        }
    }

    /// Seeds roster names and id counters from durable storage.
    pub fn load(sink: &SqliteMatchSink) -> PersistResult<Self> {
        Ok(Self {
            roster: sink.load_roster()?,
            session: None,
            next_match_id: sink.next_match_id()?,
            next_event_id: sink.next_event_id()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchMeta {
    pub match_id: MatchId,
    pub match_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClockView {
    pub time_remaining: f64,
    pub quarter: Quarter,
    pub running: bool,
    pub auto_paused: bool,
    pub text: String,
}

pub struct TrackerHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<TrackerEvent>,
}

impl Clone for TrackerHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

enum Command {
    NewMatch {
        home_team: String,
        away_team: String,
        resp: oneshot::Sender<Result<MatchMeta, RuntimeError>>,
    },
    SaveRoster {
        entries: Vec<RosterEntry>,
        resp: oneshot::Sender<Result<bool, RuntimeError>>,
    },
    StartClock {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    PauseClock {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    ResetQuarter {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    AdjustTime {
        delta: f64,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    AdvanceQuarter {
        resp: oneshot::Sender<Result<Quarter, RuntimeError>>,
    },
    ArmSub {
        action: SubAction,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    SelectPlayer {
        team: Team,
        slot: u8,
        resp: oneshot::Sender<Result<Selected, RuntimeError>>,
    },
    TriggerEvent {
        event_type: EventType,
        resp: oneshot::Sender<Result<Triggered, RuntimeError>>,
    },
    Clock {
        resp: oneshot::Sender<Result<ClockView, RuntimeError>>,
    },
    Score {
        resp: oneshot::Sender<Result<(u32, u32), RuntimeError>>,
    },
    LiveStats {
        resp: oneshot::Sender<Result<Vec<StatRow>, RuntimeError>>,
    },
    CriticalLog {
        resp: oneshot::Sender<Result<Vec<CriticalEvent>, RuntimeError>>,
    },
    PoolLeaderboard {
        resp: oneshot::Sender<Result<Vec<LeaderboardRow>, RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
}

type SharedSink = Arc<Mutex<Box<dyn MatchSink>>>;

pub fn spawn_tracker(
    state: TrackerState,
    sink: Option<Box<dyn MatchSink>>,
    config: RuntimeConfig,
) -> TrackerHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(256);
    let (events_tx, _) = broadcast::channel::<TrackerEvent>(1024);
    let sink: Option<SharedSink> = sink.map(|s| Arc::new(Mutex::new(s)));

    let events_tx_loop = events_tx.clone();

    tokio::spawn(async move {
        let mut state = state;
        let mut log_writer: Option<MatchLogWriter> = None;
        let mut last_tick = Instant::now();

        loop {
            let running = state
                .session
                .as_ref()
                .is_some_and(|s| s.clock().is_running());
            let deadline = last_tick + config.tick_interval;

            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break; };
                    let done = handle_command(
                        cmd,
                        &mut state,
                        &mut log_writer,
                        &events_tx_loop,
                        sink.as_ref(),
                        &config,
                        &mut last_tick,
                    )
                    .await;
                    if done {
                        break;
                    }
                }
                _ = tokio::time::sleep_until(deadline), if running => {
                    // Elapsed real time, not a nominal second, drives the
                    // accumulator; each wall window is consumed exactly once.
                    let now = Instant::now();
                    let dt = (now - last_tick).as_secs_f64();
                    last_tick = now;
                    run_tick(dt, &mut state, &mut log_writer, &events_tx_loop, sink.as_ref()).await;
                }
            }
        }
    });

    TrackerHandle { cmd_tx, events_tx }
}

impl TrackerHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events_tx.subscribe()
    }

    pub async fn new_match(
        &self,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
    ) -> Result<MatchMeta, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::NewMatch {
                home_team: home_team.into(),
                away_team: away_team.into(),
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn save_roster(&self, entries: Vec<RosterEntry>) -> Result<bool, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SaveRoster { entries, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn start_clock(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::StartClock { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn pause_clock(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::PauseClock { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn reset_quarter(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::ResetQuarter { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn adjust_time(&self, delta: f64) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::AdjustTime { delta, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn advance_quarter(&self) -> Result<Quarter, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::AdvanceQuarter { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn arm_sub(&self, action: SubAction) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::ArmSub { action, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn select_player(&self, team: Team, slot: u8) -> Result<Selected, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SelectPlayer { team, slot, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn trigger_event(&self, event_type: EventType) -> Result<Triggered, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::TriggerEvent { event_type, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn clock(&self) -> Result<ClockView, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Clock { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn score(&self) -> Result<(u32, u32), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Score { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn live_stats(&self) -> Result<Vec<StatRow>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::LiveStats { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn critical_log(&self) -> Result<Vec<CriticalEvent>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::CriticalLog { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn pool_leaderboard(&self) -> Result<Vec<LeaderboardRow>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::PoolLeaderboard { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }
}

async fn handle_command(
    cmd: Command,
    state: &mut TrackerState,
    log_writer: &mut Option<MatchLogWriter>,
    events_tx: &broadcast::Sender<TrackerEvent>,
    sink: Option<&SharedSink>,
    config: &RuntimeConfig,
    last_tick: &mut Instant,
) -> bool {
    match cmd {
        Command::NewMatch {
            home_team,
            away_team,
            resp,
        } => {
            let res = open_new_match(state, config, log_writer, sink, home_team, away_team).await;
            if let Ok(meta) = &res {
                let _ = events_tx.send(TrackerEvent::MatchOpened {
                    match_id: meta.match_id,
                    match_code: meta.match_code.clone(),
                });
                if let Some(session) = state.session.as_ref() {
                    emit_state(events_tx, session);
                }
            }
            let _ = resp.send(res);
        }
        Command::SaveRoster { entries, resp } => {
            let (records, complete) = state.roster.save(entries);
            if let Some(session) = state.session.as_mut() {
                session.set_roster(state.roster.clone());
            }
            let res = persist_ops(sink, vec![WriteOp::ReplaceRoster { players: records }])
                .await
                .map(|_| complete)
                .map_err(RuntimeError::from);
            let _ = resp.send(res);
        }
        Command::StartClock { resp } => {
            let res = match session_mut(state) {
                Ok(session) => session.start_clock().map_err(RuntimeError::from),
                Err(err) => Err(err),
            };
            if res.is_ok() {
                *last_tick = Instant::now();
                tracing::info!("clock started");
            } else {
                warn_rejected("start_clock", &res);
            }
            emit_clock_opt(events_tx, state);
            let _ = resp.send(res);
        }
        Command::PauseClock { resp } => {
            let res = match session_mut(state) {
                Ok(session) => {
                    session.pause_clock();
                    tracing::info!("clock paused");
                    Ok(())
                }
                Err(err) => Err(err),
            };
            emit_clock_opt(events_tx, state);
            let _ = resp.send(res);
        }
        Command::ResetQuarter { resp } => {
            let res = match session_mut(state) {
                Ok(session) => session.reset_quarter().map_err(RuntimeError::from),
                Err(err) => Err(err),
            };
            emit_clock_opt(events_tx, state);
            let _ = resp.send(res);
        }
        Command::AdjustTime { delta, resp } => {
            let res = match session_mut(state) {
                Ok(session) => session.adjust_time(delta).map_err(RuntimeError::from),
                Err(err) => Err(err),
            };
            emit_clock_opt(events_tx, state);
            let _ = resp.send(res);
        }
        Command::AdvanceQuarter { resp } => {
            let res = match session_mut(state) {
                Ok(session) => match session.advance_quarter() {
                    Ok(quarter) => flush_outputs(session, sink, log_writer)
                        .await
                        .map(|_| quarter)
                        .map_err(RuntimeError::from),
                    Err(err) => Err(err.into()),
                },
                Err(err) => Err(err),
            };
            if res.is_err() {
                warn_rejected("advance_quarter", &res);
            }
            emit_clock_opt(events_tx, state);
            let _ = resp.send(res);
        }
        Command::ArmSub { action, resp } => {
            let res = match session_mut(state) {
                Ok(session) => {
                    session.arm_sub(action);
                    Ok(())
                }
                Err(err) => Err(err),
            };
            let _ = resp.send(res);
        }
        Command::SelectPlayer { team, slot, resp } => {
            let res = match session_mut(state) {
                Ok(session) => match session.select_player(team, slot) {
                    Ok(selected) => flush_outputs(session, sink, log_writer)
                        .await
                        .map(|_| selected)
                        .map_err(RuntimeError::from),
                    Err(err) => Err(err.into()),
                },
                Err(err) => Err(err),
            };
            match &res {
                Ok(Selected::SubApplied { player, action }) => {
                    if let Some(session) = state.session.as_ref() {
                        let _ = events_tx.send(TrackerEvent::SubstitutionApplied {
                            player: *player,
                            action: *action,
                            quarter: session.clock().quarter(),
                        });
                        emit_state(events_tx, session);
                    }
                }
                Ok(Selected::DefensiveRecorded { player, event_type }) => {
                    if let Some(session) = state.session.as_ref() {
                        let _ = events_tx.send(TrackerEvent::EventRecorded {
                            subject: Subject::Player(*player),
                            event_type: *event_type,
                            quarter: session.clock().quarter(),
                        });
                        emit_state(events_tx, session);
                    }
                }
                Ok(Selected::BallHolder(_)) => {
                    if let Some(session) = state.session.as_ref() {
                        emit_state(events_tx, session);
                    }
                }
                Err(_) => {
                    warn_rejected("select_player", &res);
                }
            }
            let _ = resp.send(res);
        }
        Command::TriggerEvent { event_type, resp } => {
            let res = match session_mut(state) {
                Ok(session) => match session.trigger_event(event_type) {
                    Ok(triggered) => flush_outputs(session, sink, log_writer)
                        .await
                        .map(|_| triggered)
                        .map_err(RuntimeError::from),
                    Err(err) => Err(err.into()),
                },
                Err(err) => Err(err),
            };
            match &res {
                Ok(Triggered::Recorded { subject, event_type }) => {
                    if let Some(session) = state.session.as_ref() {
                        let _ = events_tx.send(TrackerEvent::EventRecorded {
                            subject: *subject,
                            event_type: *event_type,
                            quarter: session.clock().quarter(),
                        });
                        emit_state(events_tx, session);
                    }
                }
                Ok(Triggered::AwaitingDefender(_)) => {}
                Err(_) => {
                    warn_rejected("trigger_event", &res);
                }
            }
            let _ = resp.send(res);
        }
        Command::Clock { resp } => {
            let res = session_ref(state).map(|session| {
                let clock = session.clock();
                ClockView {
                    time_remaining: clock.time_remaining(),
                    quarter: clock.quarter(),
                    running: clock.is_running(),
                    auto_paused: clock.auto_paused(),
                    text: clock.status_text(),
                }
            });
            let _ = resp.send(res);
        }
        Command::Score { resp } => {
            let _ = resp.send(session_ref(state).map(|s| s.score()));
        }
        Command::LiveStats { resp } => {
            let _ = resp.send(session_ref(state).map(|s| s.live_stats()));
        }
        Command::CriticalLog { resp } => {
            let _ = resp.send(session_ref(state).map(|s| s.critical_log()));
        }
        Command::PoolLeaderboard { resp } => {
            let _ = resp.send(session_ref(state).map(|s| s.pool_leaderboard()));
        }
        Command::Shutdown { resp } => {
            let res = flush_sink(sink).await.map_err(RuntimeError::from);
            let _ = resp.send(res);
            return true;
        }
    }

    false
}

async fn run_tick(
    dt: f64,
    state: &mut TrackerState,
    log_writer: &mut Option<MatchLogWriter>,
    events_tx: &broadcast::Sender<TrackerEvent>,
    sink: Option<&SharedSink>,
) {
    let Some(session) = state.session.as_mut() else {
        return;
    };

    let result = session.tick(dt);

    // A tick whose durable write failed must not advance the clock further;
    // the failed window itself is never retried.
    if let Err(err) = flush_outputs(session, sink, log_writer).await {
        session.pause_clock();
        tracing::error!(error = %err, "tick persistence failed; clock paused");
        let _ = events_tx.send(TrackerEvent::PersistFailed {
            message: err.to_string(),
        });
    }

    match result {
        TickResult::Ticking => {}
        TickResult::QuarterEnded(quarter) => {
            let _ = events_tx.send(TrackerEvent::QuarterEnded { quarter });
        }
        TickResult::MatchFinished => {
            let _ = events_tx.send(TrackerEvent::MatchFinished);
        }
    }

    emit_clock(events_tx, session);
    let _ = events_tx.send(TrackerEvent::PoolTimes {
        rows: session.pool_leaderboard(),
    });
}

async fn open_new_match(
    state: &mut TrackerState,
    config: &RuntimeConfig,
    log_writer: &mut Option<MatchLogWriter>,
    sink: Option<&SharedSink>,
    home_team: String,
    away_team: String,
) -> Result<MatchMeta, RuntimeError> {
    if config.require_full_roster && !state.roster.is_complete() {
        return Err(EngineError::RosterIncomplete {
            missing: state.roster.missing_count(),
        }
        .into());
    }
    if state
        .session
        .as_ref()
        .is_some_and(|s| s.clock().is_running())
    {
        return Err(EngineError::ClockRunning.into());
    }

    if let Some(prev) = state.session.take() {
        state.next_event_id = prev.next_event_id();
    }

    let mut session = MatchSession::open(
        state.next_match_id,
        state.next_event_id,
        home_team,
        away_team,
        state.roster.clone(),
        config.session.clone(),
    );
    state.next_match_id += 1;

    let meta = MatchMeta {
        match_id: session.match_id(),
        match_code: session.match_code().to_string(),
    };

    *log_writer = match &config.log_dir {
        Some(dir) => Some(MatchLogWriter::create(dir, &meta.match_code)?),
        None => None,
    };

    flush_outputs(&mut session, sink, log_writer).await?;
    state.session = Some(session);
    Ok(meta)
}

async fn flush_outputs(
    session: &mut MatchSession,
    sink: Option<&SharedSink>,
    log_writer: &mut Option<MatchLogWriter>,
) -> Result<(), PersistError> {
    persist_ops(sink, session.drain_writes()).await?;
    for entry in session.drain_log() {
        if let Some(writer) = log_writer.as_mut() {
            writer.append(&entry)?;
        }
    }
    Ok(())
}

async fn persist_ops(sink: Option<&SharedSink>, ops: Vec<WriteOp>) -> Result<(), PersistError> {
    let Some(sink) = sink else {
        return Ok(());
    };
    if ops.is_empty() {
        return Ok(());
    }

    let sink_ref = Arc::clone(sink);
    tokio::task::spawn_blocking(move || {
        let mut sink = sink_ref.blocking_lock();
        sink.apply(&ops)
    })
    .await
    .map_err(|e| PersistError::Message(format!("join error: {e}")))?
}

async fn flush_sink(sink: Option<&SharedSink>) -> Result<(), PersistError> {
    let Some(sink) = sink else {
        return Ok(());
    };
    let sink_ref = Arc::clone(sink);
    tokio::task::spawn_blocking(move || {
        let mut sink = sink_ref.blocking_lock();
        sink.flush()
    })
    .await
    .map_err(|e| PersistError::Message(format!("join error: {e}")))?
}

fn session_ref<'a>(state: &'a TrackerState) -> Result<&'a MatchSession, RuntimeError> {
    state
        .session
        .as_ref()
        .ok_or(RuntimeError::Engine(EngineError::NoActiveMatch))
}

fn session_mut<'a>(state: &'a mut TrackerState) -> Result<&'a mut MatchSession, RuntimeError> {
    state
        .session
        .as_mut()
        .ok_or(RuntimeError::Engine(EngineError::NoActiveMatch))
}

fn emit_clock(events_tx: &broadcast::Sender<TrackerEvent>, session: &MatchSession) {
    let clock = session.clock();
    let _ = events_tx.send(TrackerEvent::ClockChanged {
        time_remaining: clock.time_remaining(),
        quarter: clock.quarter(),
        running: clock.is_running(),
        auto_paused: clock.auto_paused(),
        text: clock.status_text(),
    });
}

fn emit_clock_opt(events_tx: &broadcast::Sender<TrackerEvent>, state: &TrackerState) {
    if let Some(session) = state.session.as_ref() {
        emit_clock(events_tx, session);
    }
}

fn emit_state(events_tx: &broadcast::Sender<TrackerEvent>, session: &MatchSession) {
    emit_clock(events_tx, session);
    let (home, away) = session.score();
    let _ = events_tx.send(TrackerEvent::ScoreChanged { home, away });
    let _ = events_tx.send(TrackerEvent::BallChanged {
        holder: session.ball_holder(),
        team: session.possession_team(),
    });
}

fn warn_rejected<T>(command: &str, res: &Result<T, RuntimeError>) {
    if let Err(err) = res {
        tracing::warn!(command, error = %err, "command rejected");
    }
}
