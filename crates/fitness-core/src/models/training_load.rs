// ABOUTME: Daily aggregate inputs and dense daily training load rows
// ABOUTME: CTL, ATL, TSB and rolling volume/efficiency keyed by athlete-local date
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-day totals across every analysed activity on that date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyImpulse {
    /// Athlete-local calendar date
    pub date: NaiveDate,
    /// Sum of training impulse
    pub training_impulse: f64,
    /// Sum of distance in meters
    pub distance_meters: f64,
    /// Sum of per-activity efficiency factors with a non-zero value
    pub efficiency_sum: f64,
    /// Number of activities contributing to `efficiency_sum`
    pub efficiency_count: u32,
    /// Number of activities on the date
    pub activity_count: u32,
}

/// Training load for one calendar day
///
/// Produced only by the training load model. The series is dense: days
/// without activity carry zero impulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTrainingLoad {
    /// Athlete-local calendar date
    pub date: NaiveDate,
    /// Impulse recorded on this date
    pub daily_impulse: f64,
    /// Chronic training load (42-day EMA)
    pub ctl: f64,
    /// Acute training load (7-day EMA)
    pub atl: f64,
    /// Training stress balance (CTL - ATL)
    pub tsb: f64,
    /// Distance over the trailing 7 days (meters)
    pub distance_7d_meters: f64,
    /// Mean efficiency factor over the trailing 7 days
    pub efficiency_7d: Option<f64>,
}
