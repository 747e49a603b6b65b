// ABOUTME: Fitness intelligence engine for aerobic efficiency and training load analysis
// ABOUTME: Stateless metric functions, EMA training load model, and trend regression
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Fitness Intelligence
//!
//! Pure functions over stream samples and daily aggregates. Nothing in this
//! crate performs I/O, so a single malformed activity can never abort a batch.

// Re-export fitness-core modules so algorithm files can keep `use crate::models::*`
pub use fitness_core::constants;
pub use fitness_core::models;

/// Athlete heart-rate profile used by impulse and stress calculations
pub mod config;
/// Per-activity efficiency, decoupling, drift, and impulse metrics
pub mod metrics;
/// Latest-load and trend summary built after a rebuild
pub mod snapshot;
/// Linear regression trend analysis and moving averages
pub mod statistical_analysis;
/// Chronic/acute training load via exponential smoothing
pub mod training_load;

pub use config::{HeartRateProfile, ProfileError};
pub use metrics::MetricsEngine;
pub use snapshot::FitnessSnapshot;
pub use statistical_analysis::{analyze_trend, moving_average, TrendAnalysis, TrendDirection};
pub use training_load::{TrainingLoadModel, TrainingStatus};
