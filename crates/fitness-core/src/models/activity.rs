// ABOUTME: Activity summary model as returned by the provider's paginated listing
// ABOUTME: Immutable once stored except for the streams-fetched flag
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque provider-assigned activity identifier
pub type ActivityId = u64;

/// Activity kinds that count as runs
const RUN_KINDS: [&str; 3] = ["Run", "TrailRun", "VirtualRun"];

/// Summary of one recorded activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    /// Provider activity id
    pub id: ActivityId,
    /// Athlete-supplied title
    pub name: String,
    /// Activity kind, e.g. "Run" or "Ride"
    pub sport_type: String,
    /// Start instant (UTC)
    pub start_date: DateTime<Utc>,
    /// Start in the athlete's local time zone
    pub start_date_local: NaiveDateTime,
    /// Moving time in seconds
    pub moving_time_secs: u64,
    /// Elapsed time in seconds
    pub elapsed_time_secs: u64,
    /// Distance in meters
    pub distance_meters: f64,
    /// Average speed in m/s
    pub average_speed: f64,
    /// Max speed in m/s
    pub max_speed: f64,
    /// Average heart rate (bpm), absent without a sensor
    pub average_heart_rate: Option<f64>,
    /// Max heart rate (bpm), absent without a sensor
    pub max_heart_rate: Option<f64>,
    /// Average cadence
    pub average_cadence: Option<f64>,
    /// Whether the activity was recorded with a heart-rate sensor
    pub has_heartrate: bool,
    /// Whether the sensor stream has been persisted
    pub streams_fetched: bool,
}

impl ActivitySummary {
    /// Whether this activity is a run of any flavor
    #[must_use]
    pub fn is_run(&self) -> bool {
        RUN_KINDS.contains(&self.sport_type.as_str())
    }

    /// Whether this activity qualifies for stream and metrics processing
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.is_run() && self.has_heartrate
    }

    /// Athlete-local calendar date of the start
    #[must_use]
    pub fn local_date(&self) -> NaiveDate {
        self.start_date_local.date()
    }

    /// Human-readable label for progress reporting
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.local_date())
    }

    /// Duration used for load calculations, preferring moving time
    #[must_use]
    pub fn duration_secs(&self) -> u64 {
        if self.moving_time_secs > 0 {
            self.moving_time_secs
        } else {
            self.elapsed_time_secs
        }
    }
}
