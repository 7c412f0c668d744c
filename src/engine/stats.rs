use hashbrown::HashMap;

use crate::core::roster::Roster;
use crate::record::CriticalEvent;
use crate::types::{EventType, Quarter, Subject, Team};

/// One live-stats table row.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRow {
    pub subject: Subject,
    pub label: String,
    pub counts: Vec<(EventType, u32)>,
    pub total: u32,
}

/// End-of-quarter critical-event digest.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterSummary {
    pub quarter: Quarter,
    pub total: usize,
    pub home: usize,
    pub away: usize,
    /// Up to three most frequent types.
    pub top: Vec<(EventType, u32)>,
    /// Entries of the quarter, latest clock time first.
    pub entries: Vec<CriticalEvent>,
}

/// Per-subject event counters, running score, and the critical-event log.
/// Counters are never reset during a match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatBook {
    counters: HashMap<Subject, HashMap<EventType, u32>>,
    critical: Vec<CriticalEvent>,
    home_score: u32,
    away_score: u32,
}

impl StatBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one recorded event: bumps the subject counter, scores goals
    /// against the subject's team, and files critical types.
    pub fn record(
        &mut self,
        subject: Subject,
        event_type: EventType,
        quarter: Quarter,
        time_remaining: f64,
    ) {
        *self
            .counters
            .entry(subject)
            .or_default()
            .entry(event_type)
            .or_insert(0) += 1;

        if event_type == EventType::Goal {
            match subject.player().map(|p| p.team) {
                Some(Team::Home) => self.home_score += 1,
                Some(Team::Away) => self.away_score += 1,
                None => {}
            }
        }

        if event_type.is_critical() {
            self.critical.push(CriticalEvent {
                quarter,
                time_remaining,
                subject,
                event_type,
            });
        }
    }

    pub fn score(&self) -> (u32, u32) {
        (self.home_score, self.away_score)
    }

    pub fn count(&self, subject: Subject, event_type: EventType) -> u32 {
        self.counters
            .get(&subject)
            .and_then(|c| c.get(&event_type))
            .copied()
            .unwrap_or(0)
    }

    /// Critical events, latest clock time first.
    pub fn critical_events(&self) -> Vec<CriticalEvent> {
        let mut out = self.critical.clone();
        out.sort_by(|a, b| {
            b.time_remaining
                .partial_cmp(&a.time_remaining)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out
    }

    /// Live stats table, busiest subjects first, capped at `limit` rows.
    pub fn live_stats(&self, roster: &Roster, limit: usize) -> Vec<StatRow> {
        let mut rows: Vec<StatRow> = self
            .counters
            .iter()
            .map(|(subject, counts)| {
                let mut counts: Vec<(EventType, u32)> = counts
                    .iter()
                    .map(|(event_type, n)| (*event_type, *n))
                    .collect();
                counts.sort_by_key(|(event_type, _)| {
                    EventType::ALL.iter().position(|e| e == event_type)
                });
                let total = counts.iter().map(|(_, n)| n).sum();
                StatRow {
                    subject: *subject,
                    label: roster.label(*subject),
                    counts,
                    total,
                }
            })
            .collect();
        rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.label.cmp(&b.label)));
        rows.truncate(limit);
        rows
    }

    /// Digest of one quarter's critical events, or `None` when it had none.
    pub fn quarter_summary(&self, quarter: Quarter) -> Option<QuarterSummary> {
        let mut entries: Vec<CriticalEvent> = self
            .critical
            .iter()
            .filter(|e| e.quarter == quarter)
            .cloned()
            .collect();
        if entries.is_empty() {
            return None;
        }
        entries.sort_by(|a, b| {
            b.time_remaining
                .partial_cmp(&a.time_remaining)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let home = entries
            .iter()
            .filter(|e| e.subject.player().is_some_and(|p| p.team == Team::Home))
            .count();
        let away = entries
            .iter()
            .filter(|e| e.subject.player().is_some_and(|p| p.team == Team::Away))
            .count();

        let mut by_type: HashMap<EventType, u32> = HashMap::new();
        for entry in &entries {
            *by_type.entry(entry.event_type).or_insert(0) += 1;
        }
        let mut top: Vec<(EventType, u32)> = by_type.into_iter().collect();
        top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        top.truncate(3);

        Some(QuarterSummary {
            quarter,
            total: entries.len(),
            home,
            away,
            top,
            entries,
        })
    }
}
