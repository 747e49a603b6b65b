// ABOUTME: Core data models for activity ingestion and fitness analytics
// ABOUTME: Summaries, sensor streams, per-activity metrics, and daily training load rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Data model shared by the provider client, the metrics engine, and storage.

/// Activity summary as listed by the provider
pub mod activity;
/// Derived per-activity metrics
pub mod metrics;
/// Second-indexed sensor streams
pub mod stream;
/// Daily aggregates and training load rows
pub mod training_load;

pub use activity::{ActivityId, ActivitySummary};
pub use metrics::ActivityMetrics;
pub use stream::{sort_by_time_offset, StreamSample};
pub use training_load::{DailyImpulse, DailyTrainingLoad};
