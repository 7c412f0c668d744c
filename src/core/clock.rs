use serde::{Deserialize, Serialize};

use crate::types::{QUARTERS_PER_MATCH, Quarter, mmss};

/// Behavior of a manual quarter advance when already on the last quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuarterRollover {
    /// Wrap back to quarter 1.
    WrapToFirst,
    /// Refuse the advance.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockPhase {
    Idle,
    Running,
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    Ticking,
    QuarterEnded(Quarter),
    MatchFinished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchClock {
    quarter_len: f64,
    time_remaining: f64,
    quarter: Quarter,
    phase: ClockPhase,
    auto_paused: bool,
}

impl MatchClock {
    pub fn new(quarter_len: f64) -> Self {
        Self {
            quarter_len,
            time_remaining: quarter_len,
            quarter: 1,
            phase: ClockPhase::Idle,
            auto_paused: false,
        }
    }

    pub fn quarter_len(&self) -> f64 {
        self.quarter_len
    }

    pub fn time_remaining(&self) -> f64 {
        self.time_remaining
    }

    pub fn quarter(&self) -> Quarter {
        self.quarter
    }

    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == ClockPhase::Running
    }

    pub fn is_finished(&self) -> bool {
        self.phase == ClockPhase::Finished
    }

    pub fn auto_paused(&self) -> bool {
        self.auto_paused
    }

    /// No-op when already running.
    pub fn start(&mut self) {
        if matches!(self.phase, ClockPhase::Running | ClockPhase::Finished) {
            return;
        }
        self.phase = ClockPhase::Running;
        self.auto_paused = false;
    }

    /// Manual stop; idempotent.
    pub fn pause(&mut self) {
        if matches!(self.phase, ClockPhase::Idle | ClockPhase::Finished) {
            self.auto_paused = false;
            return;
        }
        self.phase = ClockPhase::Paused;
        self.auto_paused = false;
    }

    /// Same stop as [`MatchClock::pause`], flagged for display purposes.
    pub fn auto_pause(&mut self) {
        if self.phase == ClockPhase::Finished {
            return;
        }
        self.phase = ClockPhase::Paused;
        self.auto_paused = true;
    }

    /// Clamps into `[0, quarter_len]` and always stops the clock: a time
    /// edit may never race a live tick.
    pub fn adjust(&mut self, delta: f64) {
        self.time_remaining = (self.time_remaining + delta).clamp(0.0, self.quarter_len);
        self.pause();
    }

    /// Stops the clock and returns to the top of quarter 1.
    pub fn reset(&mut self) {
        self.time_remaining = self.quarter_len;
        self.quarter = 1;
        self.phase = ClockPhase::Idle;
        self.auto_paused = false;
    }

    /// Advances one quarter, stopping the clock. On quarter 4 the configured
    /// rollover policy decides between wrapping to quarter 1 and refusing.
    pub fn advance_quarter(&mut self, policy: QuarterRollover) -> Result<Quarter, ()> {
        if self.quarter < QUARTERS_PER_MATCH {
            self.quarter += 1;
        } else {
            match policy {
                QuarterRollover::WrapToFirst => self.quarter = 1,
                QuarterRollover::Reject => return Err(()),
            }
        }
        self.time_remaining = self.quarter_len;
        self.phase = ClockPhase::Paused;
        self.auto_paused = false;
        Ok(self.quarter)
    }

    /// Consumes one elapsed wall-clock window. Only meaningful while running.
    pub fn tick(&mut self, dt: f64) -> TickResult {
        debug_assert!(self.is_running());
        self.time_remaining -= dt;
        if self.time_remaining > 0.0 {
            return TickResult::Ticking;
        }

        self.time_remaining = 0.0;
        self.auto_paused = true;
        if self.quarter < QUARTERS_PER_MATCH {
            let ended = self.quarter;
            self.quarter += 1;
            self.time_remaining = self.quarter_len;
            self.phase = ClockPhase::Paused;
            TickResult::QuarterEnded(ended)
        } else {
            self.phase = ClockPhase::Finished;
            TickResult::MatchFinished
        }
    }

    pub fn status_text(&self) -> String {
        match self.phase {
            ClockPhase::Finished => "MATCH FINISHED".to_string(),
            ClockPhase::Running => {
                format!("{} > Q{}", mmss(self.time_remaining), self.quarter)
            }
            _ if self.auto_paused => {
                format!("{} ||(auto) Q{}", mmss(self.time_remaining), self.quarter)
            }
            _ => format!("{} [] Q{}", mmss(self.time_remaining), self.quarter),
        }
    }

    pub(crate) fn restore(
        quarter_len: f64,
        time_remaining: f64,
        quarter: Quarter,
        started: bool,
    ) -> Self {
        Self {
            quarter_len,
            time_remaining: time_remaining.clamp(0.0, quarter_len),
            quarter: quarter.clamp(1, QUARTERS_PER_MATCH),
            phase: if started { ClockPhase::Paused } else { ClockPhase::Idle },
            auto_paused: false,
        }
    }
}
