// ABOUTME: Fitness snapshot summarising the latest training load and recent trends
// ABOUTME: Combines the dense load series with daily efficiency means after each rebuild
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::training_load::CTL_WINDOW_DAYS;
use crate::models::{DailyImpulse, DailyTrainingLoad};
use crate::statistical_analysis::{analyze_trend, moving_average, TrendAnalysis};
use crate::training_load::{TrainingLoadModel, TrainingStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Window for smoothing daily efficiency before fitting a trend
const EFFICIENCY_SMOOTHING_WINDOW: usize = 5;

/// Number of most recent efficiency days considered
const EFFICIENCY_LOOKBACK_POINTS: usize = 60;

/// Latest fitness state with trend context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessSnapshot {
    /// Most recent daily load row
    pub latest: DailyTrainingLoad,
    /// TSB interpretation for the latest row
    pub status: TrainingStatus,
    /// CTL trend over the trailing 42 days
    pub fitness_trend: TrendAnalysis,
    /// Trend of smoothed daily efficiency factor
    pub efficiency_trend: TrendAnalysis,
}

impl FitnessSnapshot {
    /// Build a snapshot from the dense load series and daily aggregates
    ///
    /// Returns `None` when the series is empty.
    #[must_use]
    pub fn build(rows: &[DailyTrainingLoad], days: &[DailyImpulse]) -> Option<Self> {
        let latest = rows.last()?.clone();

        let ctl_window = rows.len().saturating_sub(CTL_WINDOW_DAYS as usize);
        let recent = &rows[ctl_window..];
        let ctl_values: Vec<f64> = recent.iter().map(|r| r.ctl).collect();
        let ctl_dates: Vec<NaiveDate> = recent.iter().map(|r| r.date).collect();

        Some(Self {
            status: TrainingLoadModel::interpret_tsb(latest.tsb),
            fitness_trend: analyze_trend(&ctl_values, &ctl_dates),
            efficiency_trend: efficiency_trend(days),
            latest,
        })
    }
}

fn efficiency_trend(days: &[DailyImpulse]) -> TrendAnalysis {
    let mut points: Vec<(NaiveDate, f64)> = days
        .iter()
        .filter(|d| d.efficiency_count > 0)
        .map(|d| (d.date, d.efficiency_sum / f64::from(d.efficiency_count)))
        .collect();
    points.sort_by_key(|(date, _)| *date);
    let start = points.len().saturating_sub(EFFICIENCY_LOOKBACK_POINTS);
    let points = &points[start..];

    let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    let smoothed = moving_average(&values, EFFICIENCY_SMOOTHING_WINDOW);
    // Smoothed values align with the last date of each window
    let offset = values.len() - smoothed.len();
    let dates: Vec<NaiveDate> = points[offset..].iter().map(|(d, _)| *d).collect();

    analyze_trend(&smoothed, &dates)
}
