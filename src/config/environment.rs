// ABOUTME: Environment-based configuration for the sync pipeline
// ABOUTME: Strava API and credentials, rate limits, sync tuning, athlete profile, and storage URL
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::{anyhow, Context, Result};
use fitness_core::constants::api_provider_limits::strava;
use fitness_core::constants::env_config;
use fitness_core::constants::physiology::{DEFAULT_MAX_HR, DEFAULT_RESTING_HR};
use fitness_core::constants::sync_defaults::{
    MAX_STREAM_CONCURRENCY, PROGRESS_BUFFER, STREAM_BATCH_SIZE, STREAM_CONCURRENCY,
};
use fitness_intelligence::HeartRateProfile;
use fitness_providers::http_client::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};
use fitness_providers::{HttpClientConfig, OAuthCredentials, RateLimitConfig};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// How the client obtains bearer credentials
#[derive(Debug, Clone)]
pub enum StravaCredentials {
    /// Refresh-token grant, optionally seeded with a current access token
    Refreshing {
        /// OAuth client credentials and refresh token
        oauth: OAuthCredentials,
        /// Access token to use until the first refresh
        access_token: Option<String>,
    },
    /// Fixed access token without refresh
    Static(String),
}

/// Strava endpoint and credential configuration
#[derive(Debug, Clone)]
pub struct StravaApiConfig {
    /// API base URL
    pub base_url: String,
    /// OAuth token endpoint
    pub token_url: String,
    /// Credential source, `None` when nothing is configured
    pub credentials: Option<StravaCredentials>,
    /// HTTP timeouts
    pub http: HttpClientConfig,
}

impl StravaApiConfig {
    /// Load from `STRAVA_*` and `HTTP_*` variables
    ///
    /// # Errors
    ///
    /// Returns an error if a timeout value is not a number
    pub fn from_env() -> Result<Self> {
        let access_token = non_empty_var("STRAVA_ACCESS_TOKEN");
        let refresh = (
            non_empty_var("STRAVA_CLIENT_ID"),
            non_empty_var("STRAVA_CLIENT_SECRET"),
            non_empty_var("STRAVA_REFRESH_TOKEN"),
        );

        let credentials = match (refresh, access_token) {
            ((Some(client_id), Some(client_secret), Some(refresh_token)), access_token) => {
                Some(StravaCredentials::Refreshing {
                    oauth: OAuthCredentials {
                        client_id,
                        client_secret,
                        refresh_token,
                    },
                    access_token,
                })
            }
            (_, Some(token)) => Some(StravaCredentials::Static(token)),
            (_, None) => None,
        };

        Ok(Self {
            base_url: env_config::strava_api_base(),
            token_url: env_config::strava_token_url(),
            credentials,
            http: HttpClientConfig {
                timeout_secs: parse_var("HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
                connect_timeout_secs: parse_var(
                    "HTTP_CONNECT_TIMEOUT_SECS",
                    DEFAULT_CONNECT_TIMEOUT_SECS,
                )?,
            },
        })
    }
}

/// Stream batch sizing and parallelism
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Stream candidates pulled per sync run
    pub stream_batch_size: usize,
    /// Parallel stream fetches, clamped to `1..=4`
    pub stream_concurrency: usize,
    /// Progress channel capacity
    pub progress_buffer: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            stream_batch_size: STREAM_BATCH_SIZE,
            stream_concurrency: STREAM_CONCURRENCY,
            progress_buffer: PROGRESS_BUFFER,
        }
    }
}

impl SyncSettings {
    /// Load from `SYNC_*` variables
    ///
    /// # Errors
    ///
    /// Returns an error if a value is not a number
    pub fn from_env() -> Result<Self> {
        let requested: usize = parse_var("SYNC_STREAM_CONCURRENCY", STREAM_CONCURRENCY)?;
        let stream_concurrency = requested.clamp(1, MAX_STREAM_CONCURRENCY);
        if stream_concurrency != requested {
            warn!(
                requested,
                applied = stream_concurrency,
                "SYNC_STREAM_CONCURRENCY clamped"
            );
        }

        Ok(Self {
            stream_batch_size: parse_var("SYNC_STREAM_BATCH_SIZE", STREAM_BATCH_SIZE)?.max(1),
            stream_concurrency,
            progress_buffer: parse_var("SYNC_PROGRESS_BUFFER", PROGRESS_BUFFER)?.max(1),
        })
    }
}

/// Complete process configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Storage URL (`sqlite:...` or `memory`)
    pub database_url: String,
    /// Strava endpoints and credentials
    pub strava: StravaApiConfig,
    /// Provider quotas
    pub rate_limit: RateLimitConfig,
    /// Pipeline tuning
    pub sync: SyncSettings,
    /// Athlete heart-rate anchors
    pub heart_rate: HeartRateProfile,
}

impl ServerConfig {
    /// Load configuration from environment variables and an optional `.env` file
    ///
    /// # Errors
    ///
    /// Returns an error if any value fails to parse or the heart-rate profile is invalid
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            info!("no .env file loaded: {e}");
        }

        let config = Self {
            database_url: env_config::database_url(),
            strava: StravaApiConfig::from_env()?,
            rate_limit: rate_limit_from_env()?,
            sync: SyncSettings::from_env()?,
            heart_rate: heart_rate_from_env()?,
        };

        config.validate()?;
        info!("{}", config.summary());
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns an error if a quota or window is zero
    pub fn validate(&self) -> Result<()> {
        let limits = &self.rate_limit;
        if limits.short_quota == 0 || limits.long_quota == 0 {
            return Err(anyhow!("rate limit quotas must be greater than zero"));
        }
        if limits.short_window.is_zero() || limits.long_window.is_zero() {
            return Err(anyhow!("rate limit windows must be greater than zero"));
        }
        if self.strava.credentials.is_none() {
            warn!("no Strava credentials configured; sync will fail until STRAVA_ACCESS_TOKEN or refresh credentials are set");
        }
        Ok(())
    }

    /// One-line description without secrets
    #[must_use]
    pub fn summary(&self) -> String {
        let credentials = match &self.strava.credentials {
            Some(StravaCredentials::Refreshing { .. }) => "refresh-token",
            Some(StravaCredentials::Static(_)) => "static-token",
            None => "none",
        };
        format!(
            "database={} strava={} credentials={} quota={}/{}s,{}/{}s batch={} concurrency={}",
            self.database_url,
            self.strava.base_url,
            credentials,
            self.rate_limit.short_quota,
            self.rate_limit.short_window.as_secs(),
            self.rate_limit.long_quota,
            self.rate_limit.long_window.as_secs(),
            self.sync.stream_batch_size,
            self.sync.stream_concurrency,
        )
    }
}

fn rate_limit_from_env() -> Result<RateLimitConfig> {
    Ok(RateLimitConfig {
        short_quota: parse_var("STRAVA_SHORT_QUOTA", strava::RATE_LIMIT_15MIN)?,
        short_window: Duration::from_secs(parse_var(
            "STRAVA_SHORT_WINDOW_SECS",
            strava::RATE_LIMIT_15MIN_WINDOW_SECS,
        )?),
        long_quota: parse_var("STRAVA_DAILY_QUOTA", strava::RATE_LIMIT_DAILY)?,
        long_window: Duration::from_secs(parse_var(
            "STRAVA_DAILY_WINDOW_SECS",
            strava::RATE_LIMIT_DAILY_WINDOW_SECS,
        )?),
        min_spacing: Duration::from_millis(parse_var(
            "STRAVA_MIN_REQUEST_SPACING_MS",
            strava::MIN_REQUEST_SPACING_MS,
        )?),
    })
}

fn heart_rate_from_env() -> Result<HeartRateProfile> {
    let resting = parse_var("ATHLETE_RESTING_HR", DEFAULT_RESTING_HR)?;
    let max = parse_var("ATHLETE_MAX_HR", DEFAULT_MAX_HR)?;
    let threshold = non_empty_var("ATHLETE_THRESHOLD_HR")
        .map(|v| v.parse::<f64>())
        .transpose()
        .context("Invalid ATHLETE_THRESHOLD_HR value")?;

    HeartRateProfile::new(resting, max, threshold).context("Invalid athlete heart-rate profile")
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty_var(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: {value}")),
        None => Ok(default),
    }
}
