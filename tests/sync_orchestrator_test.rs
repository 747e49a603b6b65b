// ABOUTME: End-to-end tests for the sync orchestrator with a scripted data source
// ABOUTME: Eligibility filtering, per-item isolation, watermark rules, cancellation, and reruns
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use fitness_core::errors::database::{DatabaseError, DatabaseResult};
use fitness_core::errors::provider::{ProviderError, ProviderResult};
use fitness_core::models::{
    ActivityId, ActivityMetrics, ActivitySummary, DailyImpulse, DailyTrainingLoad, StreamSample,
};
use fitness_intelligence::{HeartRateProfile, MetricsEngine};
use fitness_providers::ActivityDataSource;
use fitness_sync::config::SyncSettings;
use fitness_sync::database::{InMemoryRepository, SyncRepository};
use fitness_sync::sync::{
    ItemResult, ProgressReporter, SyncError, SyncOrchestrator, SyncPhase, SyncProgress,
};
use fitness_sync::CancellationToken;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

fn summary(id: ActivityId, sport_type: &str, has_heartrate: bool, day: u32) -> ActivitySummary {
    let start = Utc.with_ymd_and_hms(2024, 5, day, 7, 0, 0).unwrap();
    ActivitySummary {
        id,
        name: format!("Activity {id}"),
        sport_type: sport_type.to_owned(),
        start_date: start,
        start_date_local: start.naive_utc() + Duration::hours(2),
        moving_time_secs: 3600,
        elapsed_time_secs: 3700,
        distance_meters: 10_000.0,
        average_speed: 2.78,
        max_speed: 4.0,
        average_heart_rate: has_heartrate.then_some(145.0),
        max_heart_rate: has_heartrate.then_some(170.0),
        average_cadence: None,
        has_heartrate,
        streams_fetched: false,
    }
}

fn stream(len: u32) -> Vec<StreamSample> {
    (0..len)
        .map(|t| StreamSample {
            time_offset: t,
            velocity: Some(3.0),
            heart_rate: Some(140.0 + f64::from(t % 10)),
            distance: Some(3.0 * f64::from(t)),
            ..StreamSample::default()
        })
        .collect()
}

fn not_found() -> ProviderError {
    ProviderError::ApiError {
        provider: "scripted".to_owned(),
        status_code: 404,
        body: "Record Not Found".to_owned(),
    }
}

#[derive(Default)]
struct ScriptedSource {
    summaries: Vec<ActivitySummary>,
    page_size: u32,
    fail_on_page: Option<u32>,
    stream_failures: HashMap<ActivityId, ProviderError>,
    cancel_on_stream: Option<(ActivityId, CancellationToken)>,
    stream_calls: Mutex<Vec<ActivityId>>,
    watermarks_seen: Mutex<Vec<Option<DateTime<Utc>>>>,
}

impl ScriptedSource {
    fn new(summaries: Vec<ActivitySummary>) -> Self {
        Self {
            summaries,
            page_size: 200,
            ..Self::default()
        }
    }

    fn stream_calls(&self, activity_id: ActivityId) -> usize {
        self.stream_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| **id == activity_id)
            .count()
    }
}

#[async_trait]
impl ActivityDataSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn max_page_size(&self) -> u32 {
        self.page_size
    }

    async fn fetch_summaries_page(
        &self,
        after: Option<DateTime<Utc>>,
        page: u32,
        page_size: u32,
        _cancel: &CancellationToken,
    ) -> ProviderResult<Vec<ActivitySummary>> {
        if page == 1 {
            self.watermarks_seen.lock().unwrap().push(after);
        }
        if self.fail_on_page == Some(page) {
            return Err(ProviderError::Transport {
                provider: "scripted".to_owned(),
                message: "connection reset".to_owned(),
            });
        }
        Ok(self
            .summaries
            .chunks(page_size as usize)
            .nth(page as usize - 1)
            .map(<[ActivitySummary]>::to_vec)
            .unwrap_or_default())
    }

    async fn fetch_stream(
        &self,
        activity_id: ActivityId,
        _cancel: &CancellationToken,
    ) -> ProviderResult<Vec<StreamSample>> {
        self.stream_calls.lock().unwrap().push(activity_id);
        if let Some((id, token)) = &self.cancel_on_stream {
            if *id == activity_id {
                token.cancel();
                return Err(ProviderError::Cancelled);
            }
        }
        match self.stream_failures.get(&activity_id) {
            Some(error) => Err(error.clone()),
            None => Ok(stream(600)),
        }
    }
}

/// In-memory repository that fails stream writes or reads for chosen activities
#[derive(Default)]
struct FaultyRepository {
    inner: InMemoryRepository,
    failing_saves: HashSet<ActivityId>,
    unreadable_streams: HashSet<ActivityId>,
}

fn disk_full() -> DatabaseError {
    DatabaseError::QueryError {
        context: "disk I/O error".to_owned(),
    }
}

#[async_trait]
impl SyncRepository for FaultyRepository {
    async fn upsert_activity_summary(&self, summary: &ActivitySummary) -> DatabaseResult<()> {
        self.inner.upsert_activity_summary(summary).await
    }

    async fn get_activity_summary(
        &self,
        activity_id: ActivityId,
    ) -> DatabaseResult<Option<ActivitySummary>> {
        self.inner.get_activity_summary(activity_id).await
    }

    async fn list_activity_summaries(&self) -> DatabaseResult<Vec<ActivitySummary>> {
        self.inner.list_activity_summaries().await
    }

    async fn get_stream_sync_candidates(
        &self,
        limit: usize,
    ) -> DatabaseResult<Vec<ActivitySummary>> {
        self.inner.get_stream_sync_candidates(limit).await
    }

    async fn save_stream(
        &self,
        activity_id: ActivityId,
        stream: &[StreamSample],
    ) -> DatabaseResult<()> {
        if self.failing_saves.contains(&activity_id) {
            return Err(disk_full());
        }
        self.inner.save_stream(activity_id, stream).await
    }

    async fn mark_stream_synced(&self, activity_id: ActivityId) -> DatabaseResult<()> {
        self.inner.mark_stream_synced(activity_id).await
    }

    async fn get_metrics_candidates(&self) -> DatabaseResult<Vec<ActivitySummary>> {
        self.inner.get_metrics_candidates().await
    }

    async fn get_stream(&self, activity_id: ActivityId) -> DatabaseResult<Vec<StreamSample>> {
        if self.unreadable_streams.contains(&activity_id) {
            return Err(disk_full());
        }
        self.inner.get_stream(activity_id).await
    }

    async fn save_activity_metrics(&self, metrics: &ActivityMetrics) -> DatabaseResult<()> {
        self.inner.save_activity_metrics(metrics).await
    }

    async fn get_activity_metrics(
        &self,
        activity_id: ActivityId,
    ) -> DatabaseResult<Option<ActivityMetrics>> {
        self.inner.get_activity_metrics(activity_id).await
    }

    async fn get_all_daily_impulse(&self) -> DatabaseResult<Vec<DailyImpulse>> {
        self.inner.get_all_daily_impulse().await
    }

    async fn upsert_daily_training_load(&self, row: &DailyTrainingLoad) -> DatabaseResult<()> {
        self.inner.upsert_daily_training_load(row).await
    }

    async fn get_daily_training_loads(&self) -> DatabaseResult<Vec<DailyTrainingLoad>> {
        self.inner.get_daily_training_loads().await
    }

    async fn get_sync_watermark(&self) -> DatabaseResult<Option<DateTime<Utc>>> {
        self.inner.get_sync_watermark().await
    }

    async fn set_sync_watermark(&self, watermark: DateTime<Utc>) -> DatabaseResult<()> {
        self.inner.set_sync_watermark(watermark).await
    }
}

fn three_runs() -> Arc<ScriptedSource> {
    Arc::new(ScriptedSource::new(vec![
        summary(1, "Run", true, 1),
        summary(2, "Run", true, 2),
        summary(3, "Run", true, 3),
    ]))
}

fn settings(concurrency: usize) -> SyncSettings {
    SyncSettings {
        stream_batch_size: 50,
        stream_concurrency: concurrency,
        progress_buffer: 256,
    }
}

fn orchestrator(
    source: Arc<ScriptedSource>,
    repository: Arc<InMemoryRepository>,
    concurrency: usize,
) -> SyncOrchestrator {
    SyncOrchestrator::new(
        source,
        repository,
        MetricsEngine::new(HeartRateProfile::default()),
        settings(concurrency),
    )
}

#[tokio::test]
async fn test_one_stream_failure_does_not_abort_batch() {
    let mut source = ScriptedSource::new(vec![
        summary(1, "Run", true, 1),
        summary(2, "TrailRun", true, 2),
        summary(3, "Ride", true, 3),
    ]);
    source.stream_failures.insert(2, not_found());
    let source = Arc::new(source);
    let repository = Arc::new(InMemoryRepository::new());
    let (reporter, mut events) = ProgressReporter::channel(256);

    let report = orchestrator(source, repository.clone(), 1)
        .with_progress(reporter)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    let stored = repository.list_activity_summaries().await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(ActivitySummary::is_eligible));
    assert_eq!(report.activities.succeeded(), 2);
    assert_eq!(report.activities.skipped(), 1);

    assert_eq!(report.streams.succeeded(), 1);
    assert_eq!(report.streams.failed(), 1);
    assert!(matches!(
        report.streams.outcome(2).unwrap().result,
        ItemResult::Failed { ref reason } if reason.contains("404")
    ));

    assert!(repository.get_activity_metrics(1).await.unwrap().is_some());
    assert!(repository.get_activity_metrics(2).await.unwrap().is_none());
    assert_eq!(report.metrics.succeeded(), 1);

    assert!(report.watermark_advanced);
    assert!(repository.get_sync_watermark().await.unwrap().is_some());
    assert_eq!(report.trends_rows, 1);
    assert!(report.snapshot.is_some());

    let mut received: Vec<SyncProgress> = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert!(received
        .iter()
        .any(|e| e.phase == SyncPhase::Streams && e.error.is_some()));
    assert_eq!(received.last().unwrap().phase, SyncPhase::Done);
}

#[tokio::test]
async fn test_rerun_only_retries_failed_streams() {
    let mut source = ScriptedSource::new(vec![
        summary(1, "Run", true, 1),
        summary(2, "Run", true, 2),
    ]);
    source.stream_failures.insert(2, not_found());
    let source = Arc::new(source);
    let repository = Arc::new(InMemoryRepository::new());
    let sync = orchestrator(source.clone(), repository.clone(), 1);

    sync.run(&CancellationToken::new()).await.unwrap();
    let first_metrics = repository.get_activity_metrics(1).await.unwrap().unwrap();
    let second = sync.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(source.stream_calls(1), 1);
    assert_eq!(source.stream_calls(2), 2);
    assert_eq!(second.metrics.outcomes.len(), 0);
    assert_eq!(
        repository.get_activity_metrics(1).await.unwrap().unwrap(),
        first_metrics
    );

    let seen = source.watermarks_seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].is_none());
    assert!(seen[1].is_some());
}

#[tokio::test]
async fn test_pagination_failure_keeps_pages_but_not_watermark() {
    let mut source = ScriptedSource::new(vec![
        summary(1, "Run", true, 1),
        summary(2, "Run", true, 2),
        summary(3, "Run", true, 3),
    ]);
    source.page_size = 2;
    source.fail_on_page = Some(2);
    let repository = Arc::new(InMemoryRepository::new());

    let error = orchestrator(Arc::new(source), repository.clone(), 1)
        .run(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        SyncError::Provider {
            phase: SyncPhase::Activities,
            ..
        }
    ));
    assert_eq!(error.partial_report().activities.succeeded(), 2);
    assert!(!error.partial_report().watermark_advanced);
    assert_eq!(repository.list_activity_summaries().await.unwrap().len(), 2);
    assert!(repository.get_sync_watermark().await.unwrap().is_none());
}

#[tokio::test]
async fn test_first_page_failure_leaves_storage_untouched() {
    let mut source = ScriptedSource::new(vec![summary(1, "Run", true, 1)]);
    source.fail_on_page = Some(1);
    let repository = Arc::new(InMemoryRepository::new());

    let error = orchestrator(Arc::new(source), repository.clone(), 1)
        .run(&CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(error.phase(), SyncPhase::Activities);
    assert!(repository.list_activity_summaries().await.unwrap().is_empty());
    assert!(repository.get_sync_watermark().await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancelled_before_start_does_nothing() {
    let source = Arc::new(ScriptedSource::new(vec![summary(1, "Run", true, 1)]));
    let repository = Arc::new(InMemoryRepository::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let error = orchestrator(source.clone(), repository.clone(), 1)
        .run(&cancel)
        .await
        .unwrap_err();

    assert!(error.is_cancelled());
    assert_eq!(error.phase(), SyncPhase::Activities);
    assert!(source.watermarks_seen.lock().unwrap().is_empty());
    assert!(repository.list_activity_summaries().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancellation_during_streams_preserves_progress() {
    let cancel = CancellationToken::new();
    let mut source = ScriptedSource::new(vec![
        summary(1, "Run", true, 1),
        summary(2, "Run", true, 2),
        summary(3, "Run", true, 3),
    ]);
    source.cancel_on_stream = Some((2, cancel.clone()));
    let source = Arc::new(source);
    let repository = Arc::new(InMemoryRepository::new());

    let error = orchestrator(source.clone(), repository.clone(), 1)
        .run(&cancel)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        SyncError::Cancelled {
            phase: SyncPhase::Streams,
            ..
        }
    ));
    let partial = error.partial_report();
    assert!(partial.watermark_advanced);
    assert_eq!(partial.streams.succeeded(), 1);
    assert_eq!(source.stream_calls(3), 0);

    let remaining = repository.get_stream_sync_candidates(10).await.unwrap();
    let remaining_ids: Vec<ActivityId> = remaining.iter().map(|s| s.id).collect();
    assert_eq!(remaining_ids, vec![2, 3]);
}

#[tokio::test]
async fn test_bounded_concurrency_processes_every_candidate() {
    let summaries = (1..=6).map(|id| summary(id, "Run", true, 1 + id as u32)).collect();
    let source = Arc::new(ScriptedSource::new(summaries));
    let repository = Arc::new(InMemoryRepository::new());

    let report = orchestrator(source, repository.clone(), 3)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.streams.succeeded(), 6);
    assert_eq!(report.metrics.succeeded(), 6);
    assert!(repository
        .get_stream_sync_candidates(10)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(report.trends_rows, 6);
}

#[tokio::test]
async fn test_batch_size_limits_stream_fetches() {
    let summaries = (1..=5).map(|id| summary(id, "Run", true, 1 + id as u32)).collect();
    let source = Arc::new(ScriptedSource::new(summaries));
    let repository = Arc::new(InMemoryRepository::new());
    let sync = SyncOrchestrator::new(
        source.clone(),
        repository.clone(),
        MetricsEngine::new(HeartRateProfile::default()),
        SyncSettings {
            stream_batch_size: 2,
            ..settings(1)
        },
    );

    let report = sync.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.streams.outcomes.len(), 2);
    assert_eq!(source.stream_calls(1), 1);
    assert_eq!(source.stream_calls(2), 1);
    assert_eq!(source.stream_calls(3), 0);
    assert_eq!(
        repository.get_stream_sync_candidates(10).await.unwrap().len(),
        3
    );
}

#[tokio::test]
async fn test_stream_storage_failure_is_isolated() {
    let repository = Arc::new(FaultyRepository {
        failing_saves: HashSet::from([2]),
        ..FaultyRepository::default()
    });
    let sync = SyncOrchestrator::new(
        three_runs(),
        repository.clone(),
        MetricsEngine::new(HeartRateProfile::default()),
        settings(1),
    );

    let report = sync.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.streams.succeeded(), 2);
    assert_eq!(report.streams.failed(), 1);
    assert!(matches!(
        report.streams.outcome(2).unwrap().result,
        ItemResult::Failed { ref reason } if reason.contains("disk I/O error")
    ));
    assert!(matches!(
        report.streams.outcome(3).unwrap().result,
        ItemResult::Success
    ));
    assert!(repository.get_activity_metrics(3).await.unwrap().is_some());

    let retry: Vec<ActivityId> = repository
        .get_stream_sync_candidates(10)
        .await
        .unwrap()
        .iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(retry, vec![2]);
}

#[tokio::test]
async fn test_unreadable_stream_skips_metrics_and_continues() {
    let repository = Arc::new(FaultyRepository {
        unreadable_streams: HashSet::from([1]),
        ..FaultyRepository::default()
    });
    let sync = SyncOrchestrator::new(
        three_runs(),
        repository.clone(),
        MetricsEngine::new(HeartRateProfile::default()),
        settings(1),
    );

    let report = sync.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.streams.succeeded(), 3);
    assert_eq!(report.metrics.skipped(), 1);
    assert_eq!(report.metrics.succeeded(), 2);
    assert_eq!(report.metrics.failed(), 0);
    assert!(matches!(
        report.metrics.outcome(1).unwrap().result,
        ItemResult::Skipped { .. }
    ));
    assert!(repository.get_activity_metrics(1).await.unwrap().is_none());
    assert!(repository.get_activity_metrics(2).await.unwrap().is_some());
    assert!(repository.get_activity_metrics(3).await.unwrap().is_some());
    assert!(report.snapshot.is_some());
}
