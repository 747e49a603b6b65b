// ABOUTME: Per-item results and phase reports aggregated by the sync pipeline
// ABOUTME: Success, skip, and failure counts are first-class outputs of every run
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::progress::SyncPhase;
use fitness_core::models::ActivityId;
use fitness_intelligence::FitnessSnapshot;
use serde::{Deserialize, Serialize};

/// Result of processing one activity within a phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemResult {
    /// Item processed and persisted
    Success,
    /// Item intentionally not processed
    Skipped {
        /// Why the item was skipped
        reason: String,
    },
    /// Item failed; the phase continued
    Failed {
        /// Failure description
        reason: String,
    },
}

/// Outcome recorded for one activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// Activity the outcome belongs to
    pub activity_id: ActivityId,
    /// Human-readable label
    pub label: String,
    /// What happened
    pub result: ItemResult,
}

/// Outcomes for every item a phase touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReport {
    /// Phase the outcomes belong to
    pub phase: SyncPhase,
    /// Outcomes in completion order
    pub outcomes: Vec<ItemOutcome>,
}

impl PhaseReport {
    /// Empty report for a phase
    #[must_use]
    pub const fn new(phase: SyncPhase) -> Self {
        Self {
            phase,
            outcomes: Vec::new(),
        }
    }

    /// Record an outcome
    pub fn record(&mut self, activity_id: ActivityId, label: String, result: ItemResult) {
        self.outcomes.push(ItemOutcome {
            activity_id,
            label,
            result,
        });
    }

    /// Items processed successfully
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.count(|r| matches!(r, ItemResult::Success))
    }

    /// Items skipped
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|r| matches!(r, ItemResult::Skipped { .. }))
    }

    /// Items that failed
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|r| matches!(r, ItemResult::Failed { .. }))
    }

    /// Outcome for a specific activity
    #[must_use]
    pub fn outcome(&self, activity_id: ActivityId) -> Option<&ItemOutcome> {
        self.outcomes.iter().find(|o| o.activity_id == activity_id)
    }

    fn count(&self, predicate: impl Fn(&ItemResult) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.result)).count()
    }
}

/// Everything a sync run accomplished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Summary ingestion outcomes
    pub activities: PhaseReport,
    /// Stream fetch outcomes
    pub streams: PhaseReport,
    /// Metrics computation outcomes
    pub metrics: PhaseReport,
    /// Dense training load rows written
    pub trends_rows: usize,
    /// Whether the summary watermark moved forward
    pub watermark_advanced: bool,
    /// Latest load and trends after the rebuild
    pub snapshot: Option<FitnessSnapshot>,
}

impl Default for SyncReport {
    fn default() -> Self {
        Self {
            activities: PhaseReport::new(SyncPhase::Activities),
            streams: PhaseReport::new(SyncPhase::Streams),
            metrics: PhaseReport::new(SyncPhase::Metrics),
            trends_rows: 0,
            watermark_advanced: false,
            snapshot: None,
        }
    }
}

impl SyncReport {
    /// Failed items across every phase
    #[must_use]
    pub fn total_failures(&self) -> usize {
        self.activities.failed() + self.streams.failed() + self.metrics.failed()
    }
}
