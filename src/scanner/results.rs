use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::probe::{MissKind, SseFinding};

/// Counts of negative probes by cause. Only logged; reports carry the total alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissSummary {
    pub transport: usize,
    pub parse_ambiguity: usize,
    pub not_sse: usize,
}

impl MissSummary {
    pub fn record(&mut self, kind: MissKind) {
        match kind {
            MissKind::Transport => self.transport += 1,
            MissKind::ParseAmbiguity => self.parse_ambiguity += 1,
            MissKind::NotSse => self.not_sse += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.transport + self.parse_ambiguity + self.not_sse
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResult {
    pub target_spec: String,
    pub paths: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_targets: usize,
    pub total_probes: usize,
    pub findings: Vec<SseFinding>,
    /// Probes without an SSE endpoint, whatever the cause.
    pub misses: usize,
}

impl SweepResult {
    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }

    /// Findings with at least one event whose type contains `marker` (case-insensitive).
    pub fn interesting<'a>(&'a self, marker: &'a str) -> impl Iterator<Item = &'a SseFinding> + 'a {
        self.findings
            .iter()
            .filter(move |finding| has_marker(finding, marker))
    }
}

pub fn has_marker(finding: &SseFinding, marker: &str) -> bool {
    !marker.is_empty() && finding.events.iter().any(|event| type_matches(&event.event_type, marker))
}

pub fn type_matches(event_type: &str, marker: &str) -> bool {
    !marker.is_empty() && event_type.to_ascii_lowercase().contains(&marker.to_ascii_lowercase())
}
