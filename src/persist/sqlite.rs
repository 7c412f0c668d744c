//! SQLite implementation of the match sink, plus read-side queries.

use std::path::Path;
use std::str::FromStr;

use hashbrown::HashMap;
use rusqlite::{Connection, OptionalExtension, params};

use crate::core::clock::MatchClock;
use crate::core::roster::{Lineup, Roster};
use crate::core::session::{MatchSession, SessionConfig};
use crate::engine::accumulator::Accumulator;
use crate::engine::stats::StatBook;
use crate::op::WriteOp;
use crate::record::{
    EventRecord, MatchRecord, PlayerRecord, PoolTimeRow, PossessionRow, SubstitutionRecord,
};
use crate::report::{BREAKDOWN_METRICS, MatchReport, PlayerBreakdownRow};
use crate::types::{EventId, EventType, MatchId, PlayerId, Quarter, SubAction, Subject, Team};

use super::{MatchSink, PersistResult};

/// SQLite implementation of [`crate::persist::MatchSink`].
pub struct SqliteMatchSink {
    conn: Connection,
}

impl SqliteMatchSink {
    /// Opens or creates a SQLite-backed sink at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory SQLite sink.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    /// Next free match id.
    pub fn next_match_id(&self) -> PersistResult<MatchId> {
        let max: Option<i64> = self
            .conn
            .query_row("SELECT MAX(match_id) FROM matches", [], |row| row.get(0))
            .optional()?
            .flatten();
        Ok(max.unwrap_or(0) as MatchId + 1)
    }

    /// Next free event id.
    pub fn next_event_id(&self) -> PersistResult<EventId> {
        let max: Option<i64> = self
            .conn
            .query_row("SELECT MAX(event_id) FROM events", [], |row| row.get(0))
            .optional()?
            .flatten();
        Ok(max.unwrap_or(0) as EventId + 1)
    }

    /// Loads the stored roster names.
    pub fn load_roster(&self) -> PersistResult<Roster> {
        let mut stmt = self
            .conn
            .prepare("SELECT player_id, number, name FROM players")?;
        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let number: i64 = row.get(1)?;
            let name: String = row.get(2)?;
            let player = parse_col::<PlayerId>(&key)?;
            Ok(PlayerRecord {
                player,
                number: number as u32,
                name,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(Roster::from_records(records))
    }

    /// Loads one match row by code.
    pub fn load_match(&self, match_code: &str) -> PersistResult<Option<MatchRecord>> {
        let rec = self
            .conn
            .query_row(
                "SELECT match_id, match_code, date, home_team, away_team, final_score
                 FROM matches WHERE match_code = ?1",
                params![match_code],
                |row| {
                    Ok(MatchRecord {
                        match_id: row.get::<_, i64>(0)? as MatchId,
                        match_code: row.get(1)?,
                        date: row.get(2)?,
                        home_team: row.get(3)?,
                        away_team: row.get(4)?,
                        final_score: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(rec)
    }

    /// Stored events for a match, in recording order.
    pub fn events_for(&self, match_id: MatchId) -> PersistResult<Vec<EventRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, match_id, match_code, player_id, event_type, quarter,
                    time_remaining, timestamp, possession_team, ball_holder
             FROM events WHERE match_id = ?1 ORDER BY event_id ASC",
        )?;
        let rows = stmt.query_map(params![match_id as i64], |row| {
            let subject: String = row.get(3)?;
            let event_type: String = row.get(4)?;
            let possession_team: String = row.get(8)?;
            let ball_holder: Option<String> = row.get(9)?;
            Ok(EventRecord {
                event_id: row.get::<_, i64>(0)? as EventId,
                match_id: row.get::<_, i64>(1)? as MatchId,
                match_code: row.get(2)?,
                subject: parse_col::<Subject>(&subject)?,
                event_type: parse_col::<EventType>(&event_type)?,
                quarter: row.get::<_, i64>(5)? as Quarter,
                time_remaining: row.get(6)?,
                ts: row.get(7)?,
                possession_team: parse_col::<Team>(&possession_team)?,
                ball_holder: ball_holder
                    .map(|s| parse_col::<PlayerId>(&s))
                    .transpose()?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Substitution log for a match, in recording order.
    pub fn substitutions_for(&self, match_id: MatchId) -> PersistResult<Vec<SubstitutionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT player_id, quarter, time_remaining, action, timestamp
             FROM match_substitutions WHERE match_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![match_id as i64], |row| {
            let player: String = row.get(0)?;
            let action: String = row.get(3)?;
            Ok(SubstitutionRecord {
                match_id,
                player: parse_col::<PlayerId>(&player)?,
                quarter: row.get::<_, i64>(1)? as Quarter,
                time_remaining: row.get(2)?,
                action: parse_col::<SubAction>(&action)?,
                ts: row.get(4)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Pool-time rows for a match.
    pub fn pool_rows(&self, match_id: MatchId) -> PersistResult<Vec<PoolTimeRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT player_id, quarter, pool_seconds, substitutions
             FROM player_pool_time WHERE match_id = ?1",
        )?;
        let rows = stmt.query_map(params![match_id as i64], |row| {
            let player: String = row.get(0)?;
            Ok(PoolTimeRow {
                match_id,
                player: parse_col::<PlayerId>(&player)?,
                quarter: row.get::<_, i64>(1)? as Quarter,
                pool_seconds: row.get(2)?,
                substitutions: row.get::<_, i64>(3)? as u32,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Possession rows for a match.
    pub fn possession_rows(&self, match_id: MatchId) -> PersistResult<Vec<PossessionRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT player_id, quarter, possession_seconds
             FROM player_possession WHERE match_id = ?1",
        )?;
        let rows = stmt.query_map(params![match_id as i64], |row| {
            let player: String = row.get(0)?;
            Ok(PossessionRow {
                match_id,
                player: parse_col::<PlayerId>(&player)?,
                quarter: row.get::<_, i64>(1)? as Quarter,
                possession_seconds: row.get(2)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Rebuilds a paused [`MatchSession`] from durable state: events replay
    /// the stat book, the substitution log replays the in-pool sets, and
    /// the accumulation rows restore the time maps. The clock resumes at
    /// the last recorded event's quarter and time.
    pub fn load_session(
        &self,
        match_code: &str,
        config: SessionConfig,
    ) -> PersistResult<Option<MatchSession>> {
        let Some(rec) = self.load_match(match_code)? else {
            return Ok(None);
        };

        let roster = self.load_roster()?;
        let events = self.events_for(rec.match_id)?;
        let subs = self.substitutions_for(rec.match_id)?;
        let pool = self.pool_rows(rec.match_id)?;
        let possession = self.possession_rows(rec.match_id)?;

        let mut stats = StatBook::new();
        for event in &events {
            stats.record(
                event.subject,
                event.event_type,
                event.quarter,
                event.time_remaining,
            );
        }

        let mut lineup = Lineup::new();
        for sub in &subs {
            match sub.action {
                SubAction::In => {
                    lineup.insert(sub.player);
                }
                SubAction::Out => {
                    lineup.remove(sub.player);
                }
            }
        }

        let mut accumulator = Accumulator::new();
        let mut max_quarter: Quarter = 0;
        for row in &pool {
            max_quarter = max_quarter.max(row.quarter);
            accumulator.restore_pool(row.player, row.quarter, row.pool_seconds, row.substitutions);
        }
        for row in &possession {
            accumulator.restore_possession(row.player, row.quarter, row.possession_seconds);
        }

        let started = !events.is_empty() || !subs.is_empty() || !pool.is_empty();
        let (quarter, time_remaining) = match events.last() {
            Some(event) if event.quarter >= max_quarter => {
                (event.quarter, event.time_remaining)
            }
            Some(_) | None => (max_quarter.max(1), config.quarter_len_secs),
        };
        let clock = MatchClock::restore(config.quarter_len_secs, time_remaining, quarter, started);
        let possession_team = events
            .last()
            .map(|e| e.possession_team)
            .unwrap_or(Team::Home);

        let next_event_id = self.next_event_id()?;
        Ok(Some(MatchSession::restore(
            config,
            rec,
            roster,
            lineup,
            possession_team,
            stats,
            accumulator,
            clock,
            next_event_id,
        )))
    }

    /// Whole-match report over the stored events.
    pub fn match_report(&self, match_id: MatchId) -> PersistResult<MatchReport> {
        let (home_team, away_team, final_score) = self
            .conn
            .query_row(
                "SELECT home_team, away_team, final_score FROM matches WHERE match_id = ?1",
                params![match_id as i64],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?
            .unwrap_or_else(|| ("Home".to_string(), "Away".to_string(), String::new()));

        let events = self.events_for(match_id)?;

        let mut home_goals = 0u32;
        let mut away_goals = 0u32;
        let mut counts: HashMap<EventType, u32> = HashMap::new();
        let mut scorers: HashMap<PlayerId, u32> = HashMap::new();
        for event in &events {
            *counts.entry(event.event_type).or_insert(0) += 1;
            if event.event_type == EventType::Goal {
                if let Some(player) = event.subject.player() {
                    *scorers.entry(player).or_insert(0) += 1;
                    match player.team {
                        Team::Home => home_goals += 1,
                        Team::Away => away_goals += 1,
                    }
                }
            }
        }

        let mut event_counts: Vec<(EventType, u32)> = counts.into_iter().collect();
        event_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

        let mut top_scorers: Vec<(PlayerId, u32)> = scorers.into_iter().collect();
        top_scorers.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.slot.cmp(&b.0.slot)));
        top_scorers.truncate(10);

        Ok(MatchReport {
            match_id,
            home_team,
            away_team,
            final_score,
            home_goals,
            away_goals,
            event_counts,
            top_scorers,
        })
    }

    /// Per-player metric counts over the stored events, `GAME` rows excluded.
    pub fn player_breakdown(&self, match_id: MatchId) -> PersistResult<Vec<PlayerBreakdownRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT player_id, event_type, COUNT(*)
             FROM events WHERE match_id = ?1 AND player_id <> 'GAME'
             GROUP BY player_id, event_type",
        )?;
        let rows = stmt.query_map(params![match_id as i64], |row| {
            let player: String = row.get(0)?;
            let event_type: String = row.get(1)?;
            let count: i64 = row.get(2)?;
            Ok((
                parse_col::<PlayerId>(&player)?,
                parse_col::<EventType>(&event_type)?,
                count as u32,
            ))
        })?;

        let mut per_player: HashMap<PlayerId, HashMap<EventType, u32>> = HashMap::new();
        for row in rows {
            let (player, event_type, count) = row?;
            per_player.entry(player).or_default().insert(event_type, count);
        }

        let mut out: Vec<PlayerBreakdownRow> = per_player
            .into_iter()
            .map(|(player, counts)| PlayerBreakdownRow {
                player,
                counts: BREAKDOWN_METRICS
                    .into_iter()
                    .filter_map(|m| counts.get(&m).map(|n| (m, *n)))
                    .collect(),
            })
            .collect();
        out.sort_by_key(|r| (r.player.team == Team::Away, r.player.slot));
        Ok(out)
    }
}

impl MatchSink for SqliteMatchSink {
    fn apply(&mut self, ops: &[WriteOp]) -> PersistResult<()> {
        if ops.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        for op in ops {
            match op {
                WriteOp::InsertMatch { rec } => {
                    tx.execute(
                        "INSERT INTO matches (match_id, match_code, date, home_team, away_team, final_score)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            rec.match_id as i64,
                            rec.match_code,
                            rec.date,
                            rec.home_team,
                            rec.away_team,
                            rec.final_score,
                        ],
                    )?;
                }
                WriteOp::ReplaceRoster { players } => {
                    tx.execute("DELETE FROM players", [])?;
                    let mut stmt = tx.prepare(
                        "INSERT OR REPLACE INTO players (player_id, number, name, team)
                         VALUES (?1, ?2, ?3, ?4)",
                    )?;
                    for player in players {
                        stmt.execute(params![
                            player.player.storage_key(),
                            player.number as i64,
                            player.name,
                            player.player.team.as_str(),
                        ])?;
                    }
                }
                WriteOp::AppendEvent { rec } => {
                    tx.execute(
                        "INSERT INTO events (event_id, match_id, match_code, player_id, event_type,
                                             quarter, time_remaining, timestamp, possession_team, ball_holder)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                        params![
                            rec.event_id as i64,
                            rec.match_id as i64,
                            rec.match_code,
                            rec.subject.storage_key(),
                            rec.event_type.as_str(),
                            rec.quarter as i64,
                            rec.time_remaining,
                            rec.ts,
                            rec.possession_team.as_str(),
                            rec.ball_holder.map(|p| p.storage_key()),
                        ],
                    )?;
                }
                WriteOp::AddPoolTime {
                    match_id,
                    player,
                    quarter,
                    delta,
                } => {
                    tx.execute(
                        "INSERT INTO player_pool_time (match_id, player_id, quarter, pool_seconds, substitutions)
                         VALUES (?1, ?2, ?3, ?4, 0)
                         ON CONFLICT(match_id, player_id, quarter)
                         DO UPDATE SET pool_seconds = pool_seconds + excluded.pool_seconds",
                        params![*match_id as i64, player.storage_key(), *quarter as i64, delta],
                    )?;
                }
                WriteOp::AddPossession {
                    match_id,
                    player,
                    quarter,
                    delta,
                } => {
                    tx.execute(
                        "INSERT INTO player_possession (match_id, player_id, quarter, possession_seconds)
                         VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(match_id, player_id, quarter)
                         DO UPDATE SET possession_seconds = possession_seconds + excluded.possession_seconds",
                        params![*match_id as i64, player.storage_key(), *quarter as i64, delta],
                    )?;
                }
                WriteOp::AppendSubstitution { rec } => {
                    tx.execute(
                        "INSERT INTO match_substitutions (match_id, player_id, quarter, time_remaining, action, timestamp)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            rec.match_id as i64,
                            rec.player.storage_key(),
                            rec.quarter as i64,
                            rec.time_remaining,
                            rec.action.as_str(),
                            rec.ts,
                        ],
                    )?;
                    tx.execute(
                        "INSERT INTO player_pool_time (match_id, player_id, quarter, pool_seconds, substitutions)
                         VALUES (?1, ?2, ?3, 0, 1)
                         ON CONFLICT(match_id, player_id, quarter)
                         DO UPDATE SET substitutions = substitutions + 1",
                        params![rec.match_id as i64, rec.player.storage_key(), rec.quarter as i64],
                    )?;
                }
                WriteOp::SeedQuarter {
                    match_id,
                    players,
                    quarter,
                } => {
                    let mut pool_stmt = tx.prepare(
                        "INSERT OR IGNORE INTO player_pool_time
                         (match_id, player_id, quarter, pool_seconds, substitutions)
                         VALUES (?1, ?2, ?3, 0, 0)",
                    )?;
                    let mut poss_stmt = tx.prepare(
                        "INSERT OR IGNORE INTO player_possession
                         (match_id, player_id, quarter, possession_seconds)
                         VALUES (?1, ?2, ?3, 0)",
                    )?;
                    for player in players {
                        pool_stmt
                            .execute(params![*match_id as i64, player.storage_key(), *quarter as i64])?;
                        poss_stmt
                            .execute(params![*match_id as i64, player.storage_key(), *quarter as i64])?;
                    }
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn flush(&mut self) -> PersistResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
    }
}

fn parse_col<T: FromStr<Err = String>>(s: &str) -> rusqlite::Result<T> {
    s.parse::<T>().map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(
            s.len(),
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::other(err)),
        )
    })
}
