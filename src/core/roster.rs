use hashbrown::{HashMap, HashSet};

use crate::record::{PlayerRecord, RosterEntry};
use crate::types::{PlayerId, ROSTER_SLOTS, Subject, Team};

/// Names registry for the 14+14 roster slots. Slots exist whether or not a
/// name is assigned; unnamed slots fall back to a synthesized label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    names: HashMap<PlayerId, PlayerRecord>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<PlayerRecord>) -> Self {
        let mut roster = Self::new();
        for rec in records {
            roster.names.insert(rec.player, rec);
        }
        roster
    }

    /// Applies a bulk names edit. Entries with an empty name clear the slot.
    /// Returns the surviving records (for persistence) and whether every
    /// slot on both sides is now named.
    pub fn save(&mut self, entries: Vec<RosterEntry>) -> (Vec<PlayerRecord>, bool) {
        for entry in entries {
            let name = entry.name.trim();
            if name.is_empty() {
                self.names.remove(&entry.player);
            } else {
                self.names.insert(
                    entry.player,
                    PlayerRecord {
                        player: entry.player,
                        number: entry.number,
                        name: name.to_string(),
                    },
                );
            }
        }
        (self.records(), self.is_complete())
    }

    pub fn records(&self) -> Vec<PlayerRecord> {
        let mut out: Vec<PlayerRecord> = self.names.values().cloned().collect();
        out.sort_by_key(|r| (r.player.team == Team::Away, r.player.slot));
        out
    }

    pub fn is_complete(&self) -> bool {
        self.missing_count() == 0
    }

    pub fn missing_count(&self) -> usize {
        let mut missing = 0;
        for team in [Team::Home, Team::Away] {
            for slot in 1..=ROSTER_SLOTS {
                let id = PlayerId { team, slot };
                if !self.names.contains_key(&id) {
                    missing += 1;
                }
            }
        }
        missing
    }

    pub fn display_name(&self, player: PlayerId) -> String {
        self.names
            .get(&player)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| player.fallback_label())
    }

    pub fn label(&self, subject: Subject) -> String {
        match subject {
            Subject::Player(p) => self.display_name(p),
            Subject::Game => "Game".to_string(),
        }
    }
}

/// Per-team in-pool sets plus the starting lineup, captured once at the
/// first clock start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lineup {
    home: HashSet<PlayerId>,
    away: HashSet<PlayerId>,
    starting: Option<Vec<PlayerId>>,
}

impl Lineup {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, team: Team) -> &HashSet<PlayerId> {
        match team {
            Team::Home => &self.home,
            Team::Away => &self.away,
        }
    }

    fn set_mut(&mut self, team: Team) -> &mut HashSet<PlayerId> {
        match team {
            Team::Home => &mut self.home,
            Team::Away => &mut self.away,
        }
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.set(player.team).contains(&player)
    }

    pub fn insert(&mut self, player: PlayerId) -> bool {
        self.set_mut(player.team).insert(player)
    }

    pub fn remove(&mut self, player: PlayerId) -> bool {
        self.set_mut(player.team).remove(&player)
    }

    pub fn team_players(&self, team: Team) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self.set(team).iter().copied().collect();
        players.sort_by_key(|p| p.slot);
        players
    }

    pub fn all_players(&self) -> Vec<PlayerId> {
        let mut players = self.team_players(Team::Home);
        players.extend(self.team_players(Team::Away));
        players
    }

    pub fn iter(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.home.iter().chain(self.away.iter()).copied()
    }

    /// Any in-pool teammate other than `except`, lowest slot first.
    pub fn teammate_of(&self, team: Team, except: PlayerId) -> Option<PlayerId> {
        self.team_players(team).into_iter().find(|p| *p != except)
    }

    /// Records the starting lineup the first time it is called.
    pub fn capture_starting_once(&mut self) {
        if self.starting.is_none() {
            self.starting = Some(self.all_players());
        }
    }

    pub fn starting(&self) -> &[PlayerId] {
        self.starting.as_deref().unwrap_or(&[])
    }
}
