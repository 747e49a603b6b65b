// ABOUTME: Statistical analysis engine for fitness trend calculations
// ABOUTME: Ordinary least-squares regression over elapsed days, R-squared, and moving averages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::cast_precision_loss)] // Safe: statistical calculations with controlled ranges

use crate::constants::training_load::{
    MIN_TREND_POINTS, TREND_MIN_R_SQUARED, TREND_PERCENT_THRESHOLD,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Direction of a fitted trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// Rising by more than the threshold with a confident fit
    Up,
    /// Falling by more than the threshold with a confident fit
    Down,
    /// Insufficient magnitude or fit confidence
    Flat,
}

/// Result of a linear trend fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    /// Change in value per day
    pub slope: f64,
    /// Fitted value at day zero (first sample)
    pub intercept: f64,
    /// Coefficient of determination (0-1)
    pub r_squared: f64,
    /// Percent change from fitted start to fitted end
    pub percent_change: f64,
    /// Classified direction
    pub direction: TrendDirection,
    /// Number of points used
    pub sample_count: usize,
}

impl TrendAnalysis {
    /// No-trend result
    #[must_use]
    pub const fn flat(sample_count: usize) -> Self {
        Self {
            slope: 0.0,
            intercept: 0.0,
            r_squared: 0.0,
            percent_change: 0.0,
            direction: TrendDirection::Flat,
            sample_count,
        }
    }
}

/// Slope, intercept, and R² from an OLS fit
#[derive(Debug, Clone, Copy, PartialEq)]
struct RegressionResult {
    slope: f64,
    intercept: f64,
    r_squared: f64,
}

fn linear_regression(x_values: &[f64], y_values: &[f64]) -> Option<RegressionResult> {
    let n = x_values.len() as f64;
    let mean_x = x_values.iter().sum::<f64>() / n;
    let mean_y = y_values.iter().sum::<f64>() / n;

    let (sxx, sxy, syy) = x_values.iter().zip(y_values).fold(
        (0.0, 0.0, 0.0),
        |(sxx, sxy, syy), (x, y)| {
            let dx = x - mean_x;
            let dy = y - mean_y;
            (dx.mul_add(dx, sxx), dx.mul_add(dy, sxy), dy.mul_add(dy, syy))
        },
    );

    if sxx.abs() < f64::EPSILON {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = slope.mul_add(-mean_x, mean_y);

    let r_squared = if syy.abs() < f64::EPSILON {
        0.0
    } else {
        let sse: f64 = x_values
            .iter()
            .zip(y_values)
            .map(|(x, y)| {
                let residual = y - slope.mul_add(*x, intercept);
                residual * residual
            })
            .sum();
        (1.0 - sse / syy).clamp(0.0, 1.0)
    };

    Some(RegressionResult {
        slope,
        intercept,
        r_squared,
    })
}

/// Fit `value` against elapsed days since the earliest date
///
/// Requires at least three points; fewer yield a flat result. A trend is
/// `Up` or `Down` only when the percent change exceeds ±5% AND R² > 0.3.
#[must_use]
pub fn analyze_trend(values: &[f64], dates: &[NaiveDate]) -> TrendAnalysis {
    let n = values.len().min(dates.len());
    if n < MIN_TREND_POINTS {
        return TrendAnalysis::flat(n);
    }

    let Some(origin) = dates[..n].iter().min().copied() else {
        return TrendAnalysis::flat(n);
    };
    let x_values: Vec<f64> = dates[..n]
        .iter()
        .map(|d| (*d - origin).num_days() as f64)
        .collect();
    let y_values = &values[..n];

    let Some(regression) = linear_regression(&x_values, y_values) else {
        return TrendAnalysis::flat(n);
    };

    let x_end = x_values.iter().copied().fold(0.0_f64, f64::max);
    let fitted_start = regression.intercept;
    let fitted_end = regression.slope.mul_add(x_end, regression.intercept);
    let percent_change = if fitted_start.abs() < f64::EPSILON {
        0.0
    } else {
        (fitted_end - fitted_start) / fitted_start.abs() * 100.0
    };

    let confident = regression.r_squared > TREND_MIN_R_SQUARED;
    let direction = if confident && percent_change > TREND_PERCENT_THRESHOLD {
        TrendDirection::Up
    } else if confident && percent_change < -TREND_PERCENT_THRESHOLD {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    };

    TrendAnalysis {
        slope: regression.slope,
        intercept: regression.intercept,
        r_squared: regression.r_squared,
        percent_change,
        direction,
        sample_count: n,
    }
}

/// Simple trailing mean over a fixed window
///
/// Returns `len - window + 1` values. Input shorter than the window (or a
/// zero window) is returned unchanged.
#[must_use]
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() < window {
        return values.to_vec();
    }
    let divisor = window as f64;
    values
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / divisor)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regression_recovers_known_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let result = linear_regression(&x, &y);
        assert!(result.is_some_and(|r| (r.slope - 2.0).abs() < 1e-9
            && (r.intercept - 1.0).abs() < 1e-9
            && (r.r_squared - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_regression_none_for_single_x() {
        assert!(linear_regression(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_moving_average_window_one_is_identity() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(moving_average(&values, 1), values.to_vec());
    }
}
