//! Shared identifiers, team/player identity, and the event vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Monotonic match identifier.
pub type MatchId = u64;
/// Monotonic event identifier.
pub type EventId = u64;
/// Quarter number, 1..=4.
pub type Quarter = u8;

/// Quarters in a regulation match.
pub const QUARTERS_PER_MATCH: Quarter = 4;
/// Roster slots per side.
pub const ROSTER_SLOTS: u8 = 14;

/// Team side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    /// Home side.
    Home,
    /// Away side.
    Away,
}

impl Team {
    /// Stable storage string, matching the relational schema.
    pub fn as_str(self) -> &'static str {
        match self {
            Team::Home => "Home",
            Team::Away => "Away",
        }
    }

    /// The opposing side.
    pub fn opponent(self) -> Team {
        match self {
            Team::Home => Team::Away,
            Team::Away => Team::Home,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Team {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Home" => Ok(Team::Home),
            "Away" => Ok(Team::Away),
            other => Err(format!("unknown team: {other}")),
        }
    }
}

/// Tagged player identity: team membership is a first-class field, never
/// inferred from string shape. Slots run 1..=[`ROSTER_SLOTS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId {
    /// Owning team.
    pub team: Team,
    /// Roster slot, 1..=14.
    pub slot: u8,
}

impl PlayerId {
    /// Builds an id after validating the slot range.
    pub fn new(team: Team, slot: u8) -> Option<Self> {
        (1..=ROSTER_SLOTS).contains(&slot).then_some(Self { team, slot })
    }

    /// Canonical storage key, e.g. `H-Player3` / `A-Player12`.
    pub fn storage_key(&self) -> String {
        let prefix = match self.team {
            Team::Home => 'H',
            Team::Away => 'A',
        };
        format!("{prefix}-Player{}", self.slot)
    }

    /// Label used when no roster name is assigned, e.g. `Home #3`.
    pub fn fallback_label(&self) -> String {
        format!("{} #{}", self.team, self.slot)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

impl FromStr for PlayerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (team, rest) = match s.split_once("-Player") {
            Some(("H", rest)) => (Team::Home, rest),
            Some(("A", rest)) => (Team::Away, rest),
            _ => return Err(format!("unknown player id: {s}")),
        };
        let slot: u8 = rest.parse().map_err(|_| format!("unknown player id: {s}"))?;
        PlayerId::new(team, slot).ok_or_else(|| format!("slot out of range: {s}"))
    }
}

/// Subject of a recorded event: a player, or the team-neutral `GAME` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    /// A specific player.
    Player(PlayerId),
    /// Team-neutral game event.
    Game,
}

impl Subject {
    /// Storage key; the sentinel serializes as `GAME`.
    pub fn storage_key(&self) -> String {
        match self {
            Subject::Player(p) => p.storage_key(),
            Subject::Game => "GAME".to_string(),
        }
    }

    /// The player behind this subject, if any.
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            Subject::Player(p) => Some(*p),
            Subject::Game => None,
        }
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "GAME" {
            return Ok(Subject::Game);
        }
        s.parse::<PlayerId>().map(Subject::Player)
    }
}

/// Substitution direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubAction {
    /// Player enters the pool.
    In,
    /// Player leaves the pool.
    Out,
}

impl SubAction {
    /// Storage string, `IN` / `OUT`.
    pub fn as_str(self) -> &'static str {
        match self {
            SubAction::In => "IN",
            SubAction::Out => "OUT",
        }
    }
}

impl fmt::Display for SubAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(SubAction::In),
            "OUT" => Ok(SubAction::Out),
            other => Err(format!("unknown substitution action: {other}")),
        }
    }
}

/// How an event resolves its subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    /// Attributed to the current ball holder.
    Offense,
    /// Attributed to the next player selected (either team).
    Defense,
    /// Team-neutral, recorded against the `GAME` sentinel.
    Game,
}

/// Closed event vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Goal scored by the holder.
    Goal,
    /// Shot taken.
    Shot,
    /// Penalty won.
    PenWin,
    /// Exclusion won.
    ExclWin,
    /// Possession dumped.
    Dump,
    /// Ordinary foul.
    Foul,
    /// Possession reversal.
    Reversal,
    /// Shot blocked.
    Block,
    /// Goalkeeper save.
    Save,
    /// Penalty conceded.
    PLost,
    /// Exclusion conceded.
    ELost,
    /// Interception.
    Intercept,
    /// Red card.
    Red,
    /// Yellow card.
    Yellow,
    /// Wrap call.
    Wrap,
    /// Two-metre offside.
    Offside,
    /// Drive.
    Drive,
    /// Corner throw.
    Corner,
    /// Neutral-throw restart.
    DropBall,
    /// Referee conversation.
    RefChat,
    /// Team timeout.
    Timeout,
}

impl EventType {
    /// Every member of the vocabulary, in display order.
    pub const ALL: [EventType; 21] = [
        EventType::Goal,
        EventType::Shot,
        EventType::PenWin,
        EventType::ExclWin,
        EventType::Dump,
        EventType::Foul,
        EventType::Reversal,
        EventType::Block,
        EventType::Save,
        EventType::PLost,
        EventType::ELost,
        EventType::Intercept,
        EventType::Red,
        EventType::Yellow,
        EventType::Wrap,
        EventType::Offside,
        EventType::Drive,
        EventType::Corner,
        EventType::DropBall,
        EventType::RefChat,
        EventType::Timeout,
    ];

    /// Stable storage string, matching the historical vocabulary.
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Goal => "Goal",
            EventType::Shot => "Shot",
            EventType::PenWin => "Pen.Win",
            EventType::ExclWin => "Excl.Win",
            EventType::Dump => "Dump",
            EventType::Foul => "Foul",
            EventType::Reversal => "Reversal",
            EventType::Block => "Block",
            EventType::Save => "Save",
            EventType::PLost => "P.Lost",
            EventType::ELost => "E.Lost",
            EventType::Intercept => "Intercept",
            EventType::Red => "Red",
            EventType::Yellow => "Yellow",
            EventType::Wrap => "Wrap",
            EventType::Offside => "Offside",
            EventType::Drive => "Drive",
            EventType::Corner => "Corner",
            EventType::DropBall => "DropBall",
            EventType::RefChat => "Ref_Chat",
            EventType::Timeout => "Timeout",
        }
    }

    /// How the event resolves its subject.
    pub fn class(self) -> EventClass {
        match self {
            EventType::Goal
            | EventType::Shot
            | EventType::PenWin
            | EventType::ExclWin
            | EventType::Dump
            | EventType::Foul
            | EventType::Reversal => EventClass::Offense,
            EventType::Block
            | EventType::Save
            | EventType::PLost
            | EventType::ELost
            | EventType::Intercept
            | EventType::Red
            | EventType::Yellow
            | EventType::Wrap
            | EventType::Offside
            | EventType::Drive => EventClass::Defense,
            EventType::Corner | EventType::DropBall | EventType::RefChat | EventType::Timeout => {
                EventClass::Game
            }
        }
    }

    /// True for events that appear in quarter summaries and the critical log.
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            EventType::Goal
                | EventType::PLost
                | EventType::ELost
                | EventType::Yellow
                | EventType::Red
                | EventType::Wrap
                | EventType::Timeout
        )
    }

    /// True for events that stop a running clock.
    pub fn auto_pauses(self) -> bool {
        matches!(
            self,
            EventType::Goal
                | EventType::Foul
                | EventType::PenWin
                | EventType::PLost
                | EventType::ELost
                | EventType::Red
                | EventType::Yellow
                | EventType::Wrap
                | EventType::ExclWin
                | EventType::Reversal
                | EventType::Timeout
                | EventType::Offside
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown event type: {s}"))
    }
}

/// Formats clock seconds as `m:ss`.
pub fn mmss(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
