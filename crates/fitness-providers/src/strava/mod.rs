// ABOUTME: Strava provider module
// ABOUTME: HTTP client and wire models for the Strava v3 API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Rate-limited HTTP client
pub mod client;
/// Wire types and conversions
pub mod models;

pub use client::StravaClient;
pub use models::{parse_usage_header, StravaActivity, StravaStreamSet};
