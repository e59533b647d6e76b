//! Level results for the current session
//!
//! Every concluded crossing is recorded in order. Nothing is persisted; a
//! restart clears the record.

use serde::{Deserialize, Serialize};

use crate::sim::TraversalOutcome;

/// One concluded crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelResult {
    pub level_index: usize,
    pub level_name: String,
    pub outcome: TraversalOutcome,
    /// Segments on the bridge when the vehicle set off
    pub segments_used: usize,
    /// Budget left unspent
    pub budget_left: u32,
    /// How long the crossing took (seconds)
    pub crossing_secs: f32,
}

impl LevelResult {
    pub fn passed(&self) -> bool {
        self.outcome == TraversalOutcome::Passed
    }
}

/// Results in the order the crossings concluded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelResults {
    pub entries: Vec<LevelResult>,
}

impl LevelResults {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, result: LevelResult) {
        log::info!(
            "Level {} ({}): {:?}, {} segments, {} left",
            result.level_index,
            result.level_name,
            result.outcome,
            result.segments_used,
            result.budget_left
        );
        self.entries.push(result);
    }

    /// Number of tests run on a level (passed or not)
    pub fn attempts(&self, level_index: usize) -> usize {
        self.entries
            .iter()
            .filter(|r| r.level_index == level_index)
            .count()
    }

    /// Levels passed so far
    pub fn levels_passed(&self) -> usize {
        self.entries.iter().filter(|r| r.passed()).count()
    }

    /// Budget saved across passed levels
    pub fn total_budget_left(&self) -> u64 {
        self.entries
            .iter()
            .filter(|r| r.passed())
            .map(|r| r.budget_left as u64)
            .sum()
    }

    /// The passing result for a level, if any
    pub fn passing(&self, level_index: usize) -> Option<&LevelResult> {
        self.entries
            .iter()
            .find(|r| r.level_index == level_index && r.passed())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
