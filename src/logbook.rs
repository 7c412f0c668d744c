//! Append-only per-match text log.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::persist::{PersistError, PersistResult};
use crate::types::{EventType, Quarter, Team, mmss};

/// One rendered line of a quarter summary block.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryLine {
    /// Clock display text.
    pub time_str: String,
    /// Resolved player/sentinel label.
    pub label: String,
    /// Event type.
    pub event_type: EventType,
}

/// Entries appended to the match text log.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    /// File header, written once at match creation.
    Header {
        /// Home team name.
        home_team: String,
        /// Away team name.
        away_team: String,
        /// Match date text.
        date: String,
    },
    /// One recorded event.
    Event {
        /// Clock seconds remaining.
        time_remaining: f64,
        /// Quarter.
        quarter: Quarter,
        /// Possession team at the time.
        team: Team,
        /// Resolved subject label.
        label: String,
        /// Event type.
        event_type: EventType,
    },
    /// End-of-quarter critical-event digest.
    Summary {
        /// Ended quarter.
        quarter: Quarter,
        /// Critical events in the quarter.
        total: usize,
        /// Home-attributed count.
        home: usize,
        /// Away-attributed count.
        away: usize,
        /// Most frequent types, at most three.
        top: Vec<(EventType, u32)>,
        /// Entries, latest clock time first.
        lines: Vec<SummaryLine>,
    },
}

impl LogEntry {
    /// Renders the entry, including its trailing newline.
    pub fn render(&self) -> String {
        match self {
            LogEntry::Header {
                home_team,
                away_team,
                date,
            } => format!("Match: {home_team} vs {away_team} ({date})\n"),
            LogEntry::Event {
                time_remaining,
                quarter,
                team,
                label,
                event_type,
            } => format!(
                "{}\tQ{quarter}\t{team}\t\t{label}\t\t{event_type}\n",
                mmss(*time_remaining)
            ),
            LogEntry::Summary {
                quarter,
                total,
                home,
                away,
                top,
                lines,
            } => {
                let tops = top
                    .iter()
                    .map(|(event_type, n)| format!("{event_type}:{n}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut out = format!(
                    "\n--- Q{quarter} SUMMARY: {total} critical events (H:{home} A:{away}) | {tops} ---\n"
                );
                for line in lines {
                    out.push_str(&format!(
                        "  {} {} {}\n",
                        line.time_str, line.label, line.event_type
                    ));
                }
                out
            }
        }
    }
}

/// Appends rendered [`LogEntry`]s to one `match_<code>.log` file.
pub struct MatchLogWriter {
    path: PathBuf,
    file: File,
}

impl MatchLogWriter {
    /// Creates (truncating) the log file for a match code under `dir`.
    pub fn create(dir: &Path, match_code: &str) -> PersistResult<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("match_{match_code}.log"));
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&path)?;
        Ok(Self { path, file })
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry.
    pub fn append(&mut self, entry: &LogEntry) -> PersistResult<()> {
        self.file
            .write_all(entry.render().as_bytes())
            .map_err(PersistError::from)
    }
}
