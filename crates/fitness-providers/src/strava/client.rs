// ABOUTME: Rate-limited Strava HTTP client implementing the activity data source trait
// ABOUTME: Bearer auth with one refresh on 401, usage header reconciliation, cancellable I/O
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::models::{parse_usage_header, StravaActivity, StravaStreamSet};
use crate::core::ActivityDataSource;
use crate::rate_limiter::RateLimiter;
use crate::token::TokenProvider;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fitness_core::constants::api_provider_limits::strava::{STREAM_KEYS, USAGE_HEADER};
use fitness_core::constants::oauth_providers;
use fitness_core::errors::provider::{ProviderError, ProviderResult};
use fitness_core::models::{ActivityId, ActivitySummary, StreamSample};
use fitness_core::CancellationToken;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Error bodies longer than this are truncated
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Strava v3 API client
///
/// Every request acquires the shared rate limiter first and reconciles it
/// from the `X-RateLimit-Usage` header before the body is inspected.
pub struct StravaClient {
    http: Client,
    base_url: String,
    limiter: Arc<RateLimiter>,
    tokens: Arc<dyn TokenProvider>,
}

impl StravaClient {
    /// Create a client against `base_url` (e.g. `https://www.strava.com/api/v3`)
    #[must_use]
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        limiter: Arc<RateLimiter>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            limiter,
            tokens,
        }
    }

    /// The limiter shared by this client
    #[must_use]
    pub const fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> ProviderResult<T> {
        let url = format!("{}{path}", self.base_url);
        let mut refreshed = false;

        loop {
            self.limiter.acquire(cancel).await?;
            let token = cancellable(cancel, self.tokens.access_token()).await??;

            let request = self.http.get(&url).bearer_auth(&token).query(query).send();
            let response = cancellable(cancel, request)
                .await?
                .map_err(http_error)?;

            self.reconcile_usage(&response);
            let status = response.status();
            debug!(%url, status = status.as_u16(), "strava response");

            if status == StatusCode::UNAUTHORIZED && !refreshed {
                info!("strava rejected access token, refreshing once");
                cancellable(cancel, self.tokens.refresh()).await??;
                refreshed = true;
                continue;
            }

            let body = cancellable(cancel, response.text())
                .await?
                .map_err(http_error)?;

            if !status.is_success() {
                return Err(ProviderError::ApiError {
                    provider: oauth_providers::STRAVA.to_owned(),
                    status_code: status.as_u16(),
                    body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
                });
            }

            return serde_json::from_str(&body).map_err(|e| data_error(e.to_string()));
        }
    }

    fn reconcile_usage(&self, response: &Response) {
        let Some(value) = response.headers().get(USAGE_HEADER) else {
            return;
        };
        match value.to_str().ok().and_then(parse_usage_header) {
            Some((short, daily)) => self.limiter.reconcile_from_server(short, daily),
            None => debug!(header = ?value, "ignoring malformed usage header"),
        }
    }
}

#[async_trait]
impl ActivityDataSource for StravaClient {
    fn name(&self) -> &'static str {
        oauth_providers::STRAVA
    }

    #[instrument(skip(self, cancel), fields(provider = "strava"))]
    async fn fetch_summaries_page(
        &self,
        after: Option<DateTime<Utc>>,
        page: u32,
        page_size: u32,
        cancel: &CancellationToken,
    ) -> ProviderResult<Vec<ActivitySummary>> {
        let mut query = vec![
            ("page", page.to_string()),
            ("per_page", page_size.min(self.max_page_size()).to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after.timestamp().to_string()));
        }

        let activities: Vec<StravaActivity> =
            self.get_json("/athlete/activities", &query, cancel).await?;
        Ok(activities.into_iter().map(ActivitySummary::from).collect())
    }

    #[instrument(skip(self, cancel), fields(provider = "strava"))]
    async fn fetch_stream(
        &self,
        activity_id: ActivityId,
        cancel: &CancellationToken,
    ) -> ProviderResult<Vec<StreamSample>> {
        let query = [
            ("keys", STREAM_KEYS.to_owned()),
            ("key_by_type", "true".to_owned()),
        ];
        let path = format!("/activities/{activity_id}/streams");
        let streams: StravaStreamSet = self.get_json(&path, &query, cancel).await?;
        let samples = streams.into_samples().map_err(data_error)?;
        debug!(samples = samples.len(), "stream decoded");
        Ok(samples)
    }
}

/// Race a request future against the cancellation signal
async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    future: F,
) -> ProviderResult<F::Output> {
    tokio::select! {
        () = cancel.cancelled() => Err(ProviderError::Cancelled),
        output = future => Ok(output),
    }
}

fn http_error(error: reqwest::Error) -> ProviderError {
    ProviderError::from(error).for_provider(oauth_providers::STRAVA)
}

fn data_error(message: String) -> ProviderError {
    ProviderError::DataError {
        provider: oauth_providers::STRAVA.to_owned(),
        message,
    }
}
