// ABOUTME: Fitness data provider clients behind a shared rate limiter
// ABOUTME: Data source trait, pagination, credential providers, and the Strava implementation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! Provider layer for the sync pipeline.
//!
//! Every outbound request passes through one [`RateLimiter`] per provider
//! application and honors a [`CancellationToken`]. Credentials come from an
//! injected [`TokenProvider`] rather than ambient state.

pub use fitness_core::constants;
pub use fitness_core::errors;
pub use fitness_core::models;
pub use fitness_core::CancellationToken;

/// Activity data source trait and full-history pagination
pub mod core;
/// Shared HTTP client for provider API calls
pub mod http_client;
/// Multi-window request quota with injectable clock
pub mod rate_limiter;
/// Bearer credential providers
pub mod token;

/// Strava API provider implementation
#[cfg(feature = "provider-strava")]
pub mod strava;

pub use crate::core::{ActivityDataSource, SummaryFetch};
pub use fitness_core::errors::provider::{ProviderError, ProviderResult};
pub use http_client::{build_client, initialize_shared_client, shared_client, HttpClientConfig};
pub use rate_limiter::{
    Clock, ManualClock, RateLimitConfig, RateLimitStatus, RateLimiter, SystemClock,
};
#[cfg(feature = "provider-strava")]
pub use strava::StravaClient;
pub use token::{OAuthCredentials, RefreshingTokenProvider, StaticTokenProvider, TokenProvider};
