// ABOUTME: Second-indexed sensor observation model for activity streams
// ABOUTME: Samples arrive in provider order; consumers re-sort by time offset before analysis
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

/// One observation within an activity stream
///
/// `time_offset` is unique within an activity. Every other signal is optional
/// because sensors drop out and not every device records every channel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamSample {
    /// Seconds since activity start
    pub time_offset: u32,
    /// Latitude in degrees
    pub latitude: Option<f64>,
    /// Longitude in degrees
    pub longitude: Option<f64>,
    /// Elevation in meters
    pub altitude: Option<f64>,
    /// Smoothed velocity in m/s
    pub velocity: Option<f64>,
    /// Heart rate in bpm
    pub heart_rate: Option<f64>,
    /// Cadence
    pub cadence: Option<f64>,
    /// Smoothed grade in percent
    pub grade: Option<f64>,
    /// Cumulative distance in meters
    pub distance: Option<f64>,
}

impl StreamSample {
    /// Heart rate if the reading is a usable positive value
    #[must_use]
    pub fn valid_heart_rate(&self) -> Option<f64> {
        self.heart_rate.filter(|hr| hr.is_finite() && *hr > 0.0)
    }
}

/// Sort samples by time offset in place
///
/// Provider order is a received-order contract only, so analysis code calls
/// this before splitting a stream into halves or quarters.
pub fn sort_by_time_offset(samples: &mut [StreamSample]) {
    samples.sort_by_key(|sample| sample.time_offset);
}
