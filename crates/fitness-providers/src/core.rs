// ABOUTME: Core activity data source trait implemented by every provider client
// ABOUTME: Page-level fetches plus the default full-history pagination with partial results
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fitness_core::constants::api_provider_limits::strava::MAX_ACTIVITIES_PER_PAGE;
use fitness_core::errors::provider::{ProviderError, ProviderResult};
use fitness_core::models::{ActivityId, ActivitySummary, StreamSample};
use fitness_core::CancellationToken;
use tracing::{debug, warn};

/// Outcome of paging through every summary since a watermark
///
/// A mid-pagination failure keeps whatever pages arrived before it so the
/// caller can persist them without treating the window as complete.
#[derive(Debug, Default)]
pub struct SummaryFetch {
    /// Summaries from every page that succeeded, in page order
    pub summaries: Vec<ActivitySummary>,
    /// Pages fetched successfully
    pub pages: u32,
    /// Failure that stopped pagination, if any
    pub error: Option<ProviderError>,
}

impl SummaryFetch {
    /// Whether the whole page sequence was fetched
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Discard partial results on failure
    ///
    /// # Errors
    ///
    /// Returns the pagination error when the fetch did not complete.
    pub fn into_result(self) -> ProviderResult<Vec<ActivitySummary>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.summaries),
        }
    }
}

/// Remote source of activity summaries and sensor streams
///
/// Implementations must pass every request through their rate limiter and
/// honor the cancellation token at each await point.
#[async_trait]
pub trait ActivityDataSource: Send + Sync {
    /// Provider name for logs and errors
    fn name(&self) -> &'static str;

    /// Largest page size the provider accepts
    fn max_page_size(&self) -> u32 {
        MAX_ACTIVITIES_PER_PAGE
    }

    /// Fetch one page of summaries started after `after` (1-based `page`)
    async fn fetch_summaries_page(
        &self,
        after: Option<DateTime<Utc>>,
        page: u32,
        page_size: u32,
        cancel: &CancellationToken,
    ) -> ProviderResult<Vec<ActivitySummary>>;

    /// Fetch the full sensor stream for one activity
    async fn fetch_stream(
        &self,
        activity_id: ActivityId,
        cancel: &CancellationToken,
    ) -> ProviderResult<Vec<StreamSample>>;

    /// Page through every summary since `after` at the maximum page size
    ///
    /// Stops at the first short or empty page. `on_progress` receives the
    /// cumulative summary count after each page.
    async fn fetch_all_summaries_since(
        &self,
        after: Option<DateTime<Utc>>,
        on_progress: &(dyn Fn(usize) + Send + Sync),
        cancel: &CancellationToken,
    ) -> SummaryFetch {
        let page_size = self.max_page_size();
        let mut fetch = SummaryFetch::default();
        let mut page = 1;

        loop {
            match self
                .fetch_summaries_page(after, page, page_size, cancel)
                .await
            {
                Ok(batch) => {
                    let received = batch.len();
                    fetch.summaries.extend(batch);
                    fetch.pages = page;
                    on_progress(fetch.summaries.len());
                    debug!(provider = self.name(), page, received, "summary page fetched");

                    if received == 0 || received < page_size as usize {
                        return fetch;
                    }
                    page += 1;
                }
                Err(error) => {
                    warn!(
                        provider = self.name(),
                        page,
                        fetched = fetch.summaries.len(),
                        error = %error,
                        "summary pagination aborted"
                    );
                    fetch.error = Some(error);
                    return fetch;
                }
            }
        }
    }
}
