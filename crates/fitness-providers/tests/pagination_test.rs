// ABOUTME: Integration tests for full-history summary pagination on the data source trait
// ABOUTME: Short-page termination, cumulative progress, and partial results on mid-sequence failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use fitness_providers::models::{ActivityId, ActivitySummary, StreamSample};
use fitness_providers::{ActivityDataSource, CancellationToken, ProviderError, ProviderResult};
use std::sync::Mutex;

const PAGE_SIZE: u32 = 3;

/// Serves `total` summaries in pages of three, optionally failing one page
struct PagedSource {
    total: u64,
    page_size: u32,
    fail_on_page: Option<u32>,
    requested: Mutex<Vec<(u32, u32)>>,
}

impl PagedSource {
    fn new(total: u64, fail_on_page: Option<u32>) -> Self {
        Self {
            total,
            page_size: PAGE_SIZE,
            fail_on_page,
            requested: Mutex::new(Vec::new()),
        }
    }

    fn with_page_size(self, page_size: u32) -> Self {
        Self { page_size, ..self }
    }

    fn requested_pages(&self) -> Vec<(u32, u32)> {
        self.requested.lock().unwrap().clone()
    }
}

fn summary(id: u64) -> ActivitySummary {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap() + Duration::days(id as i64);
    ActivitySummary {
        id,
        name: format!("Run {id}"),
        sport_type: "Run".to_owned(),
        start_date: start,
        start_date_local: start.naive_utc(),
        moving_time_secs: 1800,
        elapsed_time_secs: 1800,
        distance_meters: 5000.0,
        average_speed: 2.8,
        max_speed: 3.5,
        average_heart_rate: Some(150.0),
        max_heart_rate: Some(170.0),
        average_cadence: None,
        has_heartrate: true,
        streams_fetched: false,
    }
}

#[async_trait]
impl ActivityDataSource for PagedSource {
    fn name(&self) -> &'static str {
        "paged"
    }

    fn max_page_size(&self) -> u32 {
        self.page_size
    }

    async fn fetch_summaries_page(
        &self,
        _after: Option<DateTime<Utc>>,
        page: u32,
        page_size: u32,
        _cancel: &CancellationToken,
    ) -> ProviderResult<Vec<ActivitySummary>> {
        self.requested.lock().unwrap().push((page, page_size));
        if self.fail_on_page == Some(page) {
            return Err(ProviderError::Transport {
                provider: "paged".to_owned(),
                message: "connection reset".to_owned(),
            });
        }
        let first = u64::from((page - 1) * page_size);
        let last = (first + u64::from(page_size)).min(self.total);
        Ok((first..last).map(summary).collect())
    }

    async fn fetch_stream(
        &self,
        _activity_id: ActivityId,
        _cancel: &CancellationToken,
    ) -> ProviderResult<Vec<StreamSample>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_pages_until_short_page() {
    let source = PagedSource::new(7, None);
    let progress = Mutex::new(Vec::new());
    let on_progress = |count: usize| progress.lock().unwrap().push(count);

    let fetch = source
        .fetch_all_summaries_since(None, &on_progress, &CancellationToken::new())
        .await;

    assert!(fetch.is_complete());
    assert_eq!(fetch.pages, 3);
    assert_eq!(fetch.summaries.len(), 7);
    assert_eq!(*progress.lock().unwrap(), vec![3, 6, 7]);
    assert_eq!(source.requested_pages(), vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn test_exact_multiple_ends_on_empty_page() {
    let source = PagedSource::new(6, None);
    let fetch = source
        .fetch_all_summaries_since(None, &|_| {}, &CancellationToken::new())
        .await;

    assert!(fetch.is_complete());
    assert_eq!(fetch.summaries.len(), 6);
    assert_eq!(source.requested_pages().len(), 3);
}

#[tokio::test]
async fn test_empty_history_is_one_request() {
    let source = PagedSource::new(0, None);
    let fetch = source
        .fetch_all_summaries_since(None, &|_| {}, &CancellationToken::new())
        .await;

    assert!(fetch.is_complete());
    assert!(fetch.summaries.is_empty());
    assert_eq!(source.requested_pages(), vec![(1, 3)]);
}

#[tokio::test]
async fn test_mid_pagination_failure_keeps_earlier_pages() {
    let source = PagedSource::new(10, Some(3));
    let fetch = source
        .fetch_all_summaries_since(None, &|_| {}, &CancellationToken::new())
        .await;

    assert!(!fetch.is_complete());
    assert_eq!(fetch.pages, 2);
    assert_eq!(fetch.summaries.len(), 6);
    assert!(matches!(fetch.error, Some(ProviderError::Transport { .. })));
}

#[tokio::test]
async fn test_into_result_surfaces_error() {
    let source = PagedSource::new(10, Some(1));
    let fetch = source
        .fetch_all_summaries_since(None, &|_| {}, &CancellationToken::new())
        .await;

    assert!(fetch.into_result().is_err());
}

#[tokio::test]
async fn test_empty_page_stops_even_with_zero_page_size() {
    let source = PagedSource::new(5, None).with_page_size(0);
    let fetch = source
        .fetch_all_summaries_since(None, &|_| {}, &CancellationToken::new())
        .await;

    assert!(fetch.is_complete());
    assert!(fetch.summaries.is_empty());
    assert_eq!(source.requested_pages(), vec![(1, 0)]);
}
