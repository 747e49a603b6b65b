// ABOUTME: Derived per-activity metrics row computed from one stream pass
// ABOUTME: Efficiency, decoupling, cardiac drift, training impulse, stress score, data quality
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::ActivityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metrics for a single activity, keyed by activity id
///
/// Always written as a whole. A missing or empty stream yields the all-zero row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMetrics {
    /// Activity these metrics belong to
    pub activity_id: ActivityId,
    /// Speed per heartbeat, scaled
    pub efficiency_factor: f64,
    /// Grade-adjusted efficiency factor
    pub normalized_efficiency_factor: f64,
    /// Efficiency loss between first and second half (percent)
    pub aerobic_decoupling: f64,
    /// Heart-rate rise over steady-state running (bpm)
    pub cardiac_drift: f64,
    /// Bannister training impulse
    pub training_impulse: f64,
    /// Heart-rate based stress score
    pub stress_score: f64,
    /// Fraction of samples with a valid heart rate (0-1)
    pub data_quality: f64,
    /// When the row was computed
    pub computed_at: DateTime<Utc>,
}

impl ActivityMetrics {
    /// All-zero metrics row for an activity without usable stream data
    #[must_use]
    pub const fn empty(activity_id: ActivityId, computed_at: DateTime<Utc>) -> Self {
        Self {
            activity_id,
            efficiency_factor: 0.0,
            normalized_efficiency_factor: 0.0,
            aerobic_decoupling: 0.0,
            cardiac_drift: 0.0,
            training_impulse: 0.0,
            stress_score: 0.0,
            data_quality: 0.0,
            computed_at,
        }
    }
}
