// ABOUTME: Strava API wire types and conversion into the domain model
// ABOUTME: Activity summaries, key-by-type stream sets, and the usage header format
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use fitness_core::models::{ActivitySummary, StreamSample};
use serde::Deserialize;

/// Activity as returned by `GET /athlete/activities`
#[derive(Debug, Clone, Deserialize)]
pub struct StravaActivity {
    /// Activity id
    pub id: u64,
    /// Title
    #[serde(default)]
    pub name: String,
    /// Legacy activity type
    #[serde(rename = "type", default)]
    pub activity_type: String,
    /// Fine-grained sport type, preferred when present
    #[serde(default)]
    pub sport_type: Option<String>,
    /// Start instant
    pub start_date: DateTime<Utc>,
    /// Local start time, serialized by Strava with a spurious `Z`
    pub start_date_local: DateTime<Utc>,
    /// Moving time in seconds
    #[serde(default)]
    pub moving_time: u64,
    /// Elapsed time in seconds
    #[serde(default)]
    pub elapsed_time: u64,
    /// Distance in meters
    #[serde(default)]
    pub distance: f64,
    /// Average speed in m/s
    #[serde(default)]
    pub average_speed: f64,
    /// Max speed in m/s
    #[serde(default)]
    pub max_speed: f64,
    /// Average heart rate
    pub average_heartrate: Option<f64>,
    /// Max heart rate
    pub max_heartrate: Option<f64>,
    /// Average cadence
    pub average_cadence: Option<f64>,
    /// Recorded with a heart-rate sensor
    #[serde(default)]
    pub has_heartrate: bool,
}

impl From<StravaActivity> for ActivitySummary {
    fn from(activity: StravaActivity) -> Self {
        let sport_type = activity
            .sport_type
            .filter(|s| !s.is_empty())
            .unwrap_or(activity.activity_type);

        Self {
            id: activity.id,
            name: activity.name,
            sport_type,
            start_date: activity.start_date,
            start_date_local: activity.start_date_local.naive_utc(),
            moving_time_secs: activity.moving_time,
            elapsed_time_secs: activity.elapsed_time,
            distance_meters: activity.distance,
            average_speed: activity.average_speed,
            max_speed: activity.max_speed,
            average_heart_rate: activity.average_heartrate,
            max_heart_rate: activity.max_heartrate,
            average_cadence: activity.average_cadence,
            has_heartrate: activity.has_heartrate || activity.average_heartrate.is_some(),
            streams_fetched: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Series<T> {
    data: Vec<Option<T>>,
}

impl<T: Copy> Series<T> {
    fn at(&self, index: usize) -> Option<T> {
        self.data.get(index).copied().flatten()
    }
}

fn at<T: Copy>(series: Option<&Series<T>>, index: usize) -> Option<T> {
    series.and_then(|s| s.at(index))
}

/// Stream set from `GET /activities/{id}/streams?key_by_type=true`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StravaStreamSet {
    time: Option<Series<f64>>,
    latlng: Option<Series<[f64; 2]>>,
    altitude: Option<Series<f64>>,
    velocity_smooth: Option<Series<f64>>,
    heartrate: Option<Series<f64>>,
    cadence: Option<Series<f64>>,
    grade_smooth: Option<Series<f64>>,
    distance: Option<Series<f64>>,
}

impl StravaStreamSet {
    /// Zip the per-signal series into samples indexed by the `time` series
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the `time` series is absent.
    pub fn into_samples(self) -> Result<Vec<StreamSample>, String> {
        let time = self
            .time
            .as_ref()
            .ok_or_else(|| "stream set has no time series".to_owned())?;

        let samples = time
            .data
            .iter()
            .enumerate()
            .filter_map(|(index, offset)| {
                let offset = (*offset)?;
                let position = at(self.latlng.as_ref(), index);
                Some(StreamSample {
                    time_offset: offset.max(0.0).round() as u32,
                    latitude: position.map(|p| p[0]),
                    longitude: position.map(|p| p[1]),
                    altitude: at(self.altitude.as_ref(), index),
                    velocity: at(self.velocity_smooth.as_ref(), index),
                    heart_rate: at(self.heartrate.as_ref(), index),
                    cadence: at(self.cadence.as_ref(), index),
                    grade: at(self.grade_smooth.as_ref(), index),
                    distance: at(self.distance.as_ref(), index),
                })
            })
            .collect();

        Ok(samples)
    }
}

/// Parse `X-RateLimit-Usage: "<short>,<daily>"`
///
/// Anything other than exactly two comma-separated integers yields `None`.
#[must_use]
pub fn parse_usage_header(value: &str) -> Option<(u32, u32)> {
    let mut parts = value.split(',').map(str::trim);
    let short = parts.next()?.parse().ok()?;
    let daily = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((short, daily))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_header_parsing() {
        assert_eq!(parse_usage_header("42,310"), Some((42, 310)));
        assert_eq!(parse_usage_header(" 7 , 8 "), Some((7, 8)));
        assert_eq!(parse_usage_header("42"), None);
        assert_eq!(parse_usage_header("1,2,3"), None);
        assert_eq!(parse_usage_header("a,b"), None);
    }

    #[test]
    fn test_missing_time_series_is_rejected() {
        let set: StravaStreamSet =
            serde_json::from_str(r#"{"heartrate":{"data":[140,141]}}"#).unwrap_or_default();
        assert!(set.into_samples().is_err());
    }

    #[test]
    fn test_sport_type_preferred_over_legacy_type() {
        let json = r#"{
            "id": 1, "name": "Trail", "type": "Run", "sport_type": "TrailRun",
            "start_date": "2024-05-04T07:30:00Z", "start_date_local": "2024-05-04T09:30:00Z",
            "moving_time": 3600, "elapsed_time": 3700, "distance": 10000.0,
            "average_speed": 2.8, "max_speed": 4.1, "has_heartrate": true,
            "average_heartrate": 150.0, "max_heartrate": 172.0
        }"#;
        let activity: Result<StravaActivity, _> = serde_json::from_str(json);
        let summary = ActivitySummary::from(activity.unwrap());
        assert_eq!(summary.sport_type, "TrailRun");
        assert!(summary.is_eligible());
        assert_eq!(summary.start_date_local.to_string(), "2024-05-04 09:30:00");
    }
}
