// ABOUTME: Training load calculations including CTL, ATL, and TSB over a dense daily grid
// ABOUTME: Implements exponential moving averages recomputed from scratch on every rebuild
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::cast_precision_loss)] // Safe: window sizes and day counts are small

use crate::constants::training_load::{ATL_WINDOW_DAYS, CTL_WINDOW_DAYS, ROLLING_WINDOW_DAYS};
use crate::models::{DailyImpulse, DailyTrainingLoad};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Calculator for chronic/acute training load
///
/// The recurrence is seeded at zero before the first day and walked over every
/// calendar day, so identical input always reproduces identical output and a
/// correction to a past activity flows through on the next rebuild.
#[derive(Debug, Clone, Copy)]
pub struct TrainingLoadModel {
    ctl_window_days: u32,
    atl_window_days: u32,
}

impl Default for TrainingLoadModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingLoadModel {
    /// Create a model with the standard 42/7 day windows
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ctl_window_days: CTL_WINDOW_DAYS,
            atl_window_days: ATL_WINDOW_DAYS,
        }
    }

    /// Smoothing factor α = 2 / (N + 1)
    #[must_use]
    pub fn smoothing_factor(window_days: u32) -> f64 {
        2.0 / (f64::from(window_days) + 1.0)
    }

    /// Walk every day in `[start, end]` and produce one row per day
    ///
    /// `daily_impulse` holds the summed impulse per date; missing dates count
    /// as zero. Rolling aggregates are left at zero/`None`, see
    /// [`Self::build_daily_series`] for the fully populated rows.
    #[must_use]
    pub fn calculate_daily_load(
        &self,
        daily_impulse: &BTreeMap<NaiveDate, f64>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<DailyTrainingLoad> {
        if start > end {
            return Vec::new();
        }

        let alpha_ctl = Self::smoothing_factor(self.ctl_window_days);
        let alpha_atl = Self::smoothing_factor(self.atl_window_days);

        let mut ctl = 0.0_f64;
        let mut atl = 0.0_f64;

        start
            .iter_days()
            .take_while(|day| *day <= end)
            .map(|date| {
                let value = daily_impulse.get(&date).copied().unwrap_or(0.0);
                ctl = alpha_ctl.mul_add(value - ctl, ctl);
                atl = alpha_atl.mul_add(value - atl, atl);
                DailyTrainingLoad {
                    date,
                    daily_impulse: value,
                    ctl,
                    atl,
                    tsb: ctl - atl,
                    distance_7d_meters: 0.0,
                    efficiency_7d: None,
                }
            })
            .collect()
    }

    /// Build the dense series from the first to the last observed day
    ///
    /// Rows carry CTL/ATL/TSB plus trailing 7-day distance and mean efficiency.
    #[must_use]
    pub fn build_daily_series(&self, days: &[DailyImpulse]) -> Vec<DailyTrainingLoad> {
        let by_date: BTreeMap<NaiveDate, &DailyImpulse> =
            days.iter().map(|day| (day.date, day)).collect();

        let (Some(start), Some(end)) = (
            by_date.keys().next().copied(),
            by_date.keys().next_back().copied(),
        ) else {
            return Vec::new();
        };

        let impulses: BTreeMap<NaiveDate, f64> = by_date
            .iter()
            .map(|(date, day)| (*date, day.training_impulse))
            .collect();

        let mut rows = self.calculate_daily_load(&impulses, start, end);
        apply_rolling_aggregates(&mut rows, &by_date);
        rows
    }

    /// Interpret a TSB value
    #[must_use]
    pub fn interpret_tsb(tsb: f64) -> TrainingStatus {
        if tsb < -10.0 {
            TrainingStatus::Overreaching
        } else if tsb < 0.0 {
            TrainingStatus::Productive
        } else if tsb <= 10.0 {
            TrainingStatus::Fresh
        } else {
            TrainingStatus::Detraining
        }
    }
}

/// Fill trailing-window distance and efficiency on a dense series
fn apply_rolling_aggregates(
    rows: &mut [DailyTrainingLoad],
    by_date: &BTreeMap<NaiveDate, &DailyImpulse>,
) {
    let mut window: VecDeque<(f64, f64, u32)> = VecDeque::with_capacity(ROLLING_WINDOW_DAYS);
    let mut distance = 0.0;
    let mut efficiency_sum = 0.0;
    let mut efficiency_count = 0_u32;

    for row in rows {
        let entry = by_date.get(&row.date).map_or((0.0, 0.0, 0), |day| {
            (day.distance_meters, day.efficiency_sum, day.efficiency_count)
        });
        window.push_back(entry);
        distance += entry.0;
        efficiency_sum += entry.1;
        efficiency_count += entry.2;

        if window.len() > ROLLING_WINDOW_DAYS {
            if let Some((d, e, c)) = window.pop_front() {
                distance -= d;
                efficiency_sum -= e;
                efficiency_count -= c;
            }
        }

        row.distance_7d_meters = distance.max(0.0);
        row.efficiency_7d =
            (efficiency_count > 0).then(|| efficiency_sum / f64::from(efficiency_count));
    }
}

/// Training status based on TSB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingStatus {
    /// TSB < -10: Overreaching, high fatigue
    Overreaching,
    /// TSB -10 to 0: Productive training zone
    Productive,
    /// TSB 0 to +10: Fresh, ready to perform
    Fresh,
    /// TSB > +10: Risk of detraining
    Detraining,
}

impl TrainingStatus {
    /// Short guidance for the status
    #[must_use]
    pub const fn advice(self) -> &'static str {
        match self {
            Self::Overreaching => "high fatigue, prioritise recovery",
            Self::Productive => "building fitness",
            Self::Fresh => "rested and ready to perform",
            Self::Detraining => "load too low to maintain fitness",
        }
    }
}
