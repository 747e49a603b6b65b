// ABOUTME: Per-activity aerobic metrics computed from a sensor stream
// ABOUTME: Efficiency factor, decoupling, cardiac drift, TRIMP, stress score, and data quality
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//! Per-activity metrics engine
//!
//! Every function here is total: insufficient data yields a zero or neutral
//! value instead of an error, so one bad activity never aborts a batch.
#![allow(clippy::cast_precision_loss)] // Safe: sample counts are far below f64 mantissa range

use crate::config::HeartRateProfile;
use crate::constants::metrics_constants::{
    EFFICIENCY_SCALE, GRADE_ADJUSTMENT_FACTOR, MIN_ANALYSIS_SAMPLES, MIN_GRADE_DIVISOR,
    MIN_HEART_RATE_BPM, MIN_VELOCITY_MPS, STEADY_STATE_TOLERANCE,
};
use crate::constants::physiology::TRIMP_EXPONENT;
use crate::models::{sort_by_time_offset, ActivityMetrics, ActivitySummary, StreamSample};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Running sums over samples that pass the velocity and heart-rate noise filter
#[derive(Debug, Default, Clone, Copy)]
struct EfficiencyAccumulator {
    velocity_sum: f64,
    adjusted_velocity_sum: f64,
    heart_rate_sum: f64,
    count: usize,
}

impl EfficiencyAccumulator {
    fn push(&mut self, sample: &StreamSample) {
        let (Some(velocity), Some(heart_rate)) = (sample.velocity, sample.heart_rate) else {
            return;
        };
        if !(velocity > MIN_VELOCITY_MPS && heart_rate > MIN_HEART_RATE_BPM) {
            return;
        }
        self.velocity_sum += velocity;
        self.adjusted_velocity_sum += grade_adjusted_velocity(velocity, sample.grade);
        self.heart_rate_sum += heart_rate;
        self.count += 1;
    }

    fn from_samples(samples: &[StreamSample]) -> Self {
        let mut acc = Self::default();
        for sample in samples {
            acc.push(sample);
        }
        acc
    }

    fn average_heart_rate(&self) -> Option<f64> {
        (self.count > 0).then(|| self.heart_rate_sum / self.count as f64)
    }

    fn efficiency(&self) -> f64 {
        ratio(self.velocity_sum, self.heart_rate_sum, self.count)
    }

    fn normalized_efficiency(&self) -> f64 {
        ratio(self.adjusted_velocity_sum, self.heart_rate_sum, self.count)
    }
}

fn ratio(velocity_sum: f64, heart_rate_sum: f64, count: usize) -> f64 {
    if count == 0 || heart_rate_sum <= 0.0 {
        return 0.0;
    }
    let n = count as f64;
    (velocity_sum / n) / (heart_rate_sum / n) * EFFICIENCY_SCALE
}

/// Velocity corrected for the cost of climbing (grade in percent)
fn grade_adjusted_velocity(velocity: f64, grade_percent: Option<f64>) -> f64 {
    let grade_fraction = grade_percent.filter(|g| g.is_finite()).unwrap_or(0.0) / 100.0;
    let divisor = grade_fraction
        .mul_add(GRADE_ADJUSTMENT_FACTOR, 1.0)
        .max(MIN_GRADE_DIVISOR);
    velocity / divisor
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0_usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Stateless metrics calculator parameterised by the athlete's heart-rate profile
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsEngine {
    profile: HeartRateProfile,
}

impl MetricsEngine {
    /// Create an engine for the given heart-rate profile
    #[must_use]
    pub const fn new(profile: HeartRateProfile) -> Self {
        Self { profile }
    }

    /// Heart-rate profile in use
    #[must_use]
    pub const fn profile(&self) -> &HeartRateProfile {
        &self.profile
    }

    /// Compute the full metrics row for one activity
    ///
    /// The stream is copied and sorted by time offset once; efficiency,
    /// impulse, and quality come from a single accumulation pass.
    #[must_use]
    pub fn compute(
        &self,
        summary: &ActivitySummary,
        stream: &[StreamSample],
        computed_at: DateTime<Utc>,
    ) -> ActivityMetrics {
        if stream.is_empty() {
            debug!(activity_id = summary.id, "empty stream, emitting zero metrics");
            return ActivityMetrics::empty(summary.id, computed_at);
        }

        let mut samples = stream.to_vec();
        sort_by_time_offset(&mut samples);

        let mut acc = EfficiencyAccumulator::default();
        let mut valid_hr = 0_usize;
        for sample in &samples {
            acc.push(sample);
            if sample.valid_heart_rate().is_some() {
                valid_hr += 1;
            }
        }

        let training_impulse = self.impulse_from_heart_rate(
            summary,
            acc.average_heart_rate().or(summary.average_heart_rate),
        );

        ActivityMetrics {
            activity_id: summary.id,
            efficiency_factor: acc.efficiency(),
            normalized_efficiency_factor: acc.normalized_efficiency(),
            aerobic_decoupling: decoupling_sorted(&samples),
            cardiac_drift: drift_sorted(summary, &samples),
            training_impulse,
            stress_score: self.stress_score(training_impulse),
            data_quality: valid_hr as f64 / samples.len() as f64,
            computed_at,
        }
    }

    /// Average filtered velocity over average filtered heart rate, scaled by 100,000
    ///
    /// Only samples with velocity > 0.5 m/s and heart rate > 80 bpm contribute.
    #[must_use]
    pub fn efficiency_factor(samples: &[StreamSample]) -> f64 {
        EfficiencyAccumulator::from_samples(samples).efficiency()
    }

    /// Efficiency factor using grade-adjusted velocity
    ///
    /// `adjusted = velocity / max(1 + grade_fraction * 3.0, 0.5)`
    #[must_use]
    pub fn normalized_efficiency_factor(samples: &[StreamSample]) -> f64 {
        EfficiencyAccumulator::from_samples(samples).normalized_efficiency()
    }

    /// Percent efficiency loss from the first half to the second half
    ///
    /// Positive values mean the back half was less efficient. Requires at
    /// least 60 samples; zero when either half has no filtered samples.
    #[must_use]
    pub fn aerobic_decoupling(samples: &[StreamSample]) -> f64 {
        let mut sorted = samples.to_vec();
        sort_by_time_offset(&mut sorted);
        decoupling_sorted(&sorted)
    }

    /// Heart-rate rise (bpm) between the first and last quarter of steady-state running
    #[must_use]
    pub fn cardiac_drift(summary: &ActivitySummary, samples: &[StreamSample]) -> f64 {
        let mut sorted = samples.to_vec();
        sort_by_time_offset(&mut sorted);
        drift_sorted(summary, &sorted)
    }

    /// Bannister training impulse for the activity
    ///
    /// `duration_minutes * r * e^(1.92 * r)` where `r` is the clamped fraction
    /// of heart-rate reserve. Average HR comes from the filtered stream,
    /// falling back to the summary; zero without any heart-rate signal.
    #[must_use]
    pub fn training_impulse(&self, summary: &ActivitySummary, samples: &[StreamSample]) -> f64 {
        let stream_hr = EfficiencyAccumulator::from_samples(samples).average_heart_rate();
        self.impulse_from_heart_rate(summary, stream_hr.or(summary.average_heart_rate))
    }

    /// Heart-rate stress score: impulse relative to one hour at threshold, times 100
    #[must_use]
    pub fn stress_score(&self, training_impulse: f64) -> f64 {
        if training_impulse <= 0.0 {
            return 0.0;
        }
        let threshold_ratio = self.profile.reserve_fraction(self.profile.threshold_hr);
        let hour_at_threshold = bannister(60.0, threshold_ratio);
        if hour_at_threshold <= 0.0 {
            return 0.0;
        }
        training_impulse / hour_at_threshold * 100.0
    }

    /// Fraction of samples carrying a valid positive heart-rate reading
    #[must_use]
    pub fn data_quality(samples: &[StreamSample]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let valid = samples
            .iter()
            .filter(|s| s.valid_heart_rate().is_some())
            .count();
        valid as f64 / samples.len() as f64
    }

    fn impulse_from_heart_rate(&self, summary: &ActivitySummary, average_hr: Option<f64>) -> f64 {
        let Some(average_hr) = average_hr.filter(|hr| hr.is_finite() && *hr > 0.0) else {
            return 0.0;
        };
        let duration_minutes = summary.duration_secs() as f64 / 60.0;
        bannister(duration_minutes, self.profile.reserve_fraction(average_hr))
    }
}

fn bannister(duration_minutes: f64, hr_ratio: f64) -> f64 {
    duration_minutes * hr_ratio * (TRIMP_EXPONENT * hr_ratio).exp()
}

fn decoupling_sorted(samples: &[StreamSample]) -> f64 {
    if samples.len() < MIN_ANALYSIS_SAMPLES {
        return 0.0;
    }
    let (first_half, second_half) = samples.split_at(samples.len() / 2);
    let first = EfficiencyAccumulator::from_samples(first_half).efficiency();
    let second = EfficiencyAccumulator::from_samples(second_half).efficiency();
    if first == 0.0 || second == 0.0 {
        return 0.0;
    }
    (first / second - 1.0) * 100.0
}

fn drift_sorted(summary: &ActivitySummary, samples: &[StreamSample]) -> f64 {
    let duration = summary.duration_secs();
    if duration == 0 || summary.distance_meters <= 0.0 {
        return 0.0;
    }
    let average_velocity = summary.distance_meters / duration as f64;
    let lower = average_velocity * (1.0 - STEADY_STATE_TOLERANCE);
    let upper = average_velocity * (1.0 + STEADY_STATE_TOLERANCE);

    let steady: Vec<f64> = samples
        .iter()
        .filter(|s| s.velocity.is_some_and(|v| (lower..=upper).contains(&v)))
        .filter_map(StreamSample::valid_heart_rate)
        .collect();

    if steady.len() < MIN_ANALYSIS_SAMPLES {
        return 0.0;
    }

    let quarter = steady.len() / 4;
    let first = mean(steady[..quarter].iter().copied());
    let last = mean(steady[steady.len() - quarter..].iter().copied());
    match (first, last) {
        (Some(first), Some(last)) => last - first,
        _ => 0.0,
    }
}
