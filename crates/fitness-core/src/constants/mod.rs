// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Provider limits, physiology defaults, metric thresholds, and environment variable names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single large file.

/// Provider identifiers
pub mod oauth_providers {
    /// Strava provider identifier
    pub const STRAVA: &str = "strava";
}

/// Provider-specific API limits
pub mod api_provider_limits {
    /// Strava-specific limits
    pub mod strava {
        /// Maximum activities per summary page accepted by the provider
        pub const MAX_ACTIVITIES_PER_PAGE: u32 = 200;
        /// Requests allowed per 15-minute window
        pub const RATE_LIMIT_15MIN: u32 = 100;
        /// Length of the short window in seconds
        pub const RATE_LIMIT_15MIN_WINDOW_SECS: u64 = 15 * 60;
        /// Requests allowed per day
        pub const RATE_LIMIT_DAILY: u32 = 1000;
        /// Length of the daily window in seconds
        pub const RATE_LIMIT_DAILY_WINDOW_SECS: u64 = 24 * 60 * 60;
        /// Minimum spacing between two requests in milliseconds
        pub const MIN_REQUEST_SPACING_MS: u64 = 250;
        /// Header carrying `short,daily` usage counters
        pub const USAGE_HEADER: &str = "x-ratelimit-usage";
        /// Stream keys requested for every activity
        pub const STREAM_KEYS: &str =
            "time,latlng,altitude,velocity_smooth,heartrate,cadence,grade_smooth,distance";
    }
}

/// Environment-based configuration defaults and accessors
pub mod env_config {
    use std::env;

    /// Default Strava API base URL
    pub const DEFAULT_STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";
    /// Default Strava OAuth token URL
    pub const DEFAULT_STRAVA_TOKEN_URL: &str = "https://www.strava.com/oauth/token";
    /// Default database URL
    pub const DEFAULT_DATABASE_URL: &str = "sqlite:./fitness-sync.db";

    /// Get Strava API base URL from environment or default
    #[must_use]
    pub fn strava_api_base() -> String {
        env::var("STRAVA_API_BASE").unwrap_or_else(|_| DEFAULT_STRAVA_API_BASE.to_owned())
    }

    /// Get Strava token URL from environment or default
    #[must_use]
    pub fn strava_token_url() -> String {
        env::var("STRAVA_TOKEN_URL").unwrap_or_else(|_| DEFAULT_STRAVA_TOKEN_URL.to_owned())
    }

    /// Get database URL from environment or default
    #[must_use]
    pub fn database_url() -> String {
        env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned())
    }
}

/// Physiological defaults used when the athlete profile is not configured
pub mod physiology {
    /// Default resting heart rate (bpm)
    pub const DEFAULT_RESTING_HR: f64 = 60.0;
    /// Default maximum heart rate (bpm)
    pub const DEFAULT_MAX_HR: f64 = 190.0;
    /// Fraction of heart rate reserve used to derive threshold HR when unset
    pub const DEFAULT_THRESHOLD_RESERVE_FRACTION: f64 = 0.85;
    /// Bannister exponential weighting factor
    pub const TRIMP_EXPONENT: f64 = 1.92;
}

/// Thresholds for per-activity metrics
pub mod metrics_constants {
    /// Minimum velocity (m/s) for a sample to count as moving
    pub const MIN_VELOCITY_MPS: f64 = 0.5;
    /// Minimum heart rate (bpm) for a sample to count as a real reading
    pub const MIN_HEART_RATE_BPM: f64 = 80.0;
    /// Scale applied to speed/HR ratios to get readable efficiency factors
    pub const EFFICIENCY_SCALE: f64 = 100_000.0;
    /// Grade multiplier for grade-adjusted velocity
    pub const GRADE_ADJUSTMENT_FACTOR: f64 = 3.0;
    /// Floor for the grade adjustment divisor
    pub const MIN_GRADE_DIVISOR: f64 = 0.5;
    /// Samples required before decoupling or drift is meaningful
    pub const MIN_ANALYSIS_SAMPLES: usize = 60;
    /// Steady-state band around average velocity (fraction)
    pub const STEADY_STATE_TOLERANCE: f64 = 0.10;
}

/// Training load model constants
pub mod training_load {
    /// Chronic training load window (days)
    pub const CTL_WINDOW_DAYS: u32 = 42;
    /// Acute training load window (days)
    pub const ATL_WINDOW_DAYS: u32 = 7;
    /// Trailing window for rolling volume and efficiency aggregates (days)
    pub const ROLLING_WINDOW_DAYS: usize = 7;
    /// Minimum points for a trend regression
    pub const MIN_TREND_POINTS: usize = 3;
    /// Percent change needed before a trend is called up or down
    pub const TREND_PERCENT_THRESHOLD: f64 = 5.0;
    /// Minimum R² before a trend is called up or down
    pub const TREND_MIN_R_SQUARED: f64 = 0.3;
}

/// Sync pipeline defaults
pub mod sync_defaults {
    /// Stream candidates pulled per sync
    pub const STREAM_BATCH_SIZE: usize = 50;
    /// Parallel stream fetches (all still pass the shared rate limiter)
    pub const STREAM_CONCURRENCY: usize = 1;
    /// Upper bound on stream concurrency
    pub const MAX_STREAM_CONCURRENCY: usize = 4;
    /// Progress channel capacity
    pub const PROGRESS_BUFFER: usize = 64;
}
