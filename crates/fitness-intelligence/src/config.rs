// ABOUTME: Athlete heart-rate profile with validation for impulse and stress calculations
// ABOUTME: Resting, threshold, and maximum heart rate with physiology defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::physiology::{
    DEFAULT_MAX_HR, DEFAULT_RESTING_HR, DEFAULT_THRESHOLD_RESERVE_FRACTION,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid heart-rate profile
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProfileError {
    /// A value was outside the physiological range
    #[error("{field} must be between {min} and {max} bpm, got {value}")]
    OutOfRange {
        /// Offending field
        field: &'static str,
        /// Provided value
        value: f64,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// Values were not ordered resting < threshold <= max
    #[error("heart rates must satisfy resting < threshold <= max (got {resting}/{threshold}/{max})")]
    Ordering {
        /// Resting HR
        resting: f64,
        /// Threshold HR
        threshold: f64,
        /// Max HR
        max: f64,
    },
}

/// Heart-rate anchors for an athlete
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateProfile {
    /// Resting heart rate (bpm)
    pub resting_hr: f64,
    /// Lactate threshold heart rate (bpm)
    pub threshold_hr: f64,
    /// Maximum heart rate (bpm)
    pub max_hr: f64,
}

impl Default for HeartRateProfile {
    fn default() -> Self {
        Self {
            resting_hr: DEFAULT_RESTING_HR,
            threshold_hr: Self::derived_threshold(DEFAULT_RESTING_HR, DEFAULT_MAX_HR),
            max_hr: DEFAULT_MAX_HR,
        }
    }
}

impl HeartRateProfile {
    /// Build a validated profile; threshold defaults to 85% of heart-rate reserve
    ///
    /// # Errors
    ///
    /// Returns `ProfileError` if a value is out of range or the ordering is violated
    pub fn new(
        resting_hr: f64,
        max_hr: f64,
        threshold_hr: Option<f64>,
    ) -> Result<Self, ProfileError> {
        check_range("resting_hr", resting_hr, 20.0, 120.0)?;
        check_range("max_hr", max_hr, 100.0, 230.0)?;
        let threshold_hr =
            threshold_hr.unwrap_or_else(|| Self::derived_threshold(resting_hr, max_hr));

        if !(resting_hr < threshold_hr && threshold_hr <= max_hr) {
            return Err(ProfileError::Ordering {
                resting: resting_hr,
                threshold: threshold_hr,
                max: max_hr,
            });
        }

        Ok(Self {
            resting_hr,
            threshold_hr,
            max_hr,
        })
    }

    /// Heart rate reserve (max - resting)
    #[must_use]
    pub fn reserve(&self) -> f64 {
        self.max_hr - self.resting_hr
    }

    /// Fraction of heart-rate reserve, clamped to [0, 1]
    #[must_use]
    pub fn reserve_fraction(&self, heart_rate: f64) -> f64 {
        let reserve = self.reserve();
        if reserve <= 0.0 {
            return 0.0;
        }
        ((heart_rate - self.resting_hr) / reserve).clamp(0.0, 1.0)
    }

    fn derived_threshold(resting_hr: f64, max_hr: f64) -> f64 {
        DEFAULT_THRESHOLD_RESERVE_FRACTION.mul_add(max_hr - resting_hr, resting_hr)
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ProfileError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ProfileError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold_is_85_percent_of_reserve() {
        let profile = HeartRateProfile::default();
        assert!((profile.threshold_hr - 170.5).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_inverted_profile() {
        let result = HeartRateProfile::new(70.0, 180.0, Some(60.0));
        assert!(matches!(result, Err(ProfileError::Ordering { .. })));
    }

    #[test]
    fn test_rejects_out_of_range_max() {
        let result = HeartRateProfile::new(60.0, 260.0, None);
        assert!(matches!(result, Err(ProfileError::OutOfRange { field: "max_hr", .. })));
    }

    #[test]
    fn test_reserve_fraction_clamps() {
        let profile = HeartRateProfile::default();
        assert!((profile.reserve_fraction(40.0)).abs() < f64::EPSILON);
        assert!((profile.reserve_fraction(250.0) - 1.0).abs() < f64::EPSILON);
        assert!((profile.reserve_fraction(125.0) - 0.5).abs() < 1e-9);
    }
}
