// ABOUTME: Sync orchestrator driving Activities, Streams, Metrics, and Trends phases in order
// ABOUTME: Isolates per-activity failures and preserves persisted progress on interruption
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Sync Orchestrator
//!
//! Phases run strictly in sequence:
//!
//! 1. **Activities**: page through summaries since the watermark and upsert the
//!    eligible ones. The watermark advances only when pagination completes.
//! 2. **Streams**: fetch streams for a bounded batch of candidates, optionally
//!    with a small number of concurrent requests through the shared limiter.
//! 3. **Metrics**: compute metrics for every activity with a new or changed stream.
//! 4. **Trends**: rebuild the dense daily training load series from full history.
//!
//! A failure for one activity is recorded in the phase report and the phase
//! continues. Cancellation, pagination failures, and storage failures on
//! phase-level queries stop the run with a [`SyncError`] carrying the partial
//! report.

use super::errors::{Interrupt, SyncError};
use super::progress::{ProgressReporter, SyncPhase, SyncProgress};
use super::report::{ItemResult, SyncReport};
use crate::config::SyncSettings;
use crate::database::SyncRepository;
use chrono::Utc;
use fitness_core::constants::sync_defaults::MAX_STREAM_CONCURRENCY;
use fitness_core::models::ActivitySummary;
use fitness_core::CancellationToken;
use fitness_intelligence::{FitnessSnapshot, MetricsEngine, TrainingLoadModel};
use fitness_providers::ActivityDataSource;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Drives one sync invocation against a data source and repository
pub struct SyncOrchestrator {
    source: Arc<dyn ActivityDataSource>,
    repository: Arc<dyn SyncRepository>,
    engine: MetricsEngine,
    load_model: TrainingLoadModel,
    settings: SyncSettings,
    progress: ProgressReporter,
}

impl SyncOrchestrator {
    /// Create an orchestrator that reports progress only through logs
    #[must_use]
    pub fn new(
        source: Arc<dyn ActivityDataSource>,
        repository: Arc<dyn SyncRepository>,
        engine: MetricsEngine,
        settings: SyncSettings,
    ) -> Self {
        Self {
            source,
            repository,
            engine,
            load_model: TrainingLoadModel::new(),
            settings,
            progress: ProgressReporter::disabled(),
        }
    }

    /// Send progress events to `reporter`
    #[must_use]
    pub fn with_progress(mut self, reporter: ProgressReporter) -> Self {
        self.progress = reporter;
        self
    }

    /// Run every phase in order
    ///
    /// # Errors
    ///
    /// Returns `SyncError` with the partial report if the run is cancelled,
    /// summary pagination fails, or a phase-level storage query fails.
    #[instrument(skip_all, fields(provider = self.source.name()))]
    pub async fn run(&self, cancel: &CancellationToken) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();

        for phase in [
            SyncPhase::Activities,
            SyncPhase::Streams,
            SyncPhase::Metrics,
            SyncPhase::Trends,
        ] {
            let outcome = if cancel.is_cancelled() {
                Err(Interrupt::Cancelled)
            } else {
                match phase {
                    SyncPhase::Activities => self.sync_activities(&mut report, cancel).await,
                    SyncPhase::Streams => self.sync_streams(&mut report, cancel).await,
                    SyncPhase::Metrics => self.compute_metrics(&mut report, cancel).await,
                    SyncPhase::Trends | SyncPhase::Done => {
                        self.rebuild_trends(&mut report, cancel).await
                    }
                }
            };

            if let Err(interrupt) = outcome {
                warn!(%phase, error = %interrupt, "sync interrupted");
                return Err(interrupt.into_sync_error(phase, report));
            }
        }

        self.progress.emit(SyncProgress::phase(SyncPhase::Done, 0));
        info!(
            activities = report.activities.succeeded(),
            streams = report.streams.succeeded(),
            metrics = report.metrics.succeeded(),
            trends_rows = report.trends_rows,
            failures = report.total_failures(),
            "sync complete"
        );
        Ok(report)
    }

    async fn sync_activities(
        &self,
        report: &mut SyncReport,
        cancel: &CancellationToken,
    ) -> Result<(), Interrupt> {
        let phase_started = Utc::now();
        let watermark = self.repository.get_sync_watermark().await?;
        info!(?watermark, "activities phase started");
        self.progress
            .emit(SyncProgress::phase(SyncPhase::Activities, 0));

        let progress = self.progress.clone();
        let on_page = move |fetched: usize| {
            progress.emit(SyncProgress {
                phase: SyncPhase::Activities,
                total: fetched,
                completed: fetched,
                current_label: None,
                error: None,
            });
        };
        let fetch = self
            .source
            .fetch_all_summaries_since(watermark, &on_page, cancel)
            .await;

        // Pages that arrived before a failure are still persisted
        for summary in &fetch.summaries {
            let result = if summary.is_eligible() {
                self.repository.upsert_activity_summary(summary).await?;
                ItemResult::Success
            } else {
                ItemResult::Skipped {
                    reason: format!("{} without heart rate or not a run", summary.sport_type),
                }
            };
            report.activities.record(summary.id, summary.label(), result);
        }

        if let Some(error) = fetch.error {
            warn!(
                pages = fetch.pages,
                persisted = report.activities.succeeded(),
                "summary pagination incomplete, watermark not advanced"
            );
            return Err(error.into());
        }

        self.repository.set_sync_watermark(phase_started).await?;
        report.watermark_advanced = true;
        info!(
            pages = fetch.pages,
            eligible = report.activities.succeeded(),
            skipped = report.activities.skipped(),
            "activities phase finished"
        );
        Ok(())
    }

    async fn sync_streams(
        &self,
        report: &mut SyncReport,
        cancel: &CancellationToken,
    ) -> Result<(), Interrupt> {
        let candidates = self
            .repository
            .get_stream_sync_candidates(self.settings.stream_batch_size)
            .await?;
        let total = candidates.len();
        let concurrency = self
            .settings
            .stream_concurrency
            .clamp(1, MAX_STREAM_CONCURRENCY);
        info!(total, concurrency, "streams phase started");
        self.progress.emit(SyncProgress::phase(SyncPhase::Streams, total));

        let mut results = stream::iter(candidates)
            .map(|summary| async move {
                let result = self.sync_one_stream(&summary, cancel).await;
                (summary, result)
            })
            .buffer_unordered(concurrency);

        let mut completed = 0;
        while let Some((summary, result)) = results.next().await {
            let result = match result {
                Ok(samples) => {
                    debug!(activity_id = summary.id, samples, "stream synced");
                    ItemResult::Success
                }
                Err(Interrupt::Cancelled) => return Err(Interrupt::Cancelled),
                Err(error) => {
                    warn!(activity_id = summary.id, error = %error, "stream sync failed");
                    ItemResult::Failed {
                        reason: error.to_string(),
                    }
                }
            };

            completed += 1;
            self.emit_item(SyncPhase::Streams, total, completed, &summary, &result);
            report.streams.record(summary.id, summary.label(), result);
        }

        info!(
            synced = report.streams.succeeded(),
            failed = report.streams.failed(),
            "streams phase finished"
        );
        Ok(())
    }

    #[instrument(skip_all, fields(activity_id = summary.id))]
    async fn sync_one_stream(
        &self,
        summary: &ActivitySummary,
        cancel: &CancellationToken,
    ) -> Result<usize, Interrupt> {
        let samples = self.source.fetch_stream(summary.id, cancel).await?;
        self.repository.save_stream(summary.id, &samples).await?;
        self.repository.mark_stream_synced(summary.id).await?;
        Ok(samples.len())
    }

    async fn compute_metrics(
        &self,
        report: &mut SyncReport,
        cancel: &CancellationToken,
    ) -> Result<(), Interrupt> {
        let candidates = self.repository.get_metrics_candidates().await?;
        let total = candidates.len();
        info!(total, "metrics phase started");
        self.progress.emit(SyncProgress::phase(SyncPhase::Metrics, total));

        for (index, summary) in candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(Interrupt::Cancelled);
            }

            let result = match self.repository.get_stream(summary.id).await {
                Ok(stream) => {
                    let metrics = self.engine.compute(summary, &stream, Utc::now());
                    match self.repository.save_activity_metrics(&metrics).await {
                        Ok(()) => ItemResult::Success,
                        Err(e) => {
                            warn!(activity_id = summary.id, error = %e, "metrics not saved");
                            ItemResult::Failed {
                                reason: e.to_string(),
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        activity_id = summary.id,
                        error = %e,
                        "stream unavailable, metrics skipped"
                    );
                    ItemResult::Skipped {
                        reason: e.to_string(),
                    }
                }
            };

            self.emit_item(SyncPhase::Metrics, total, index + 1, summary, &result);
            report.metrics.record(summary.id, summary.label(), result);
        }

        info!(
            computed = report.metrics.succeeded(),
            skipped = report.metrics.skipped(),
            failed = report.metrics.failed(),
            "metrics phase finished"
        );
        Ok(())
    }

    async fn rebuild_trends(
        &self,
        report: &mut SyncReport,
        cancel: &CancellationToken,
    ) -> Result<(), Interrupt> {
        let days = self.repository.get_all_daily_impulse().await?;
        let rows = self.load_model.build_daily_series(&days);
        info!(days = days.len(), rows = rows.len(), "trends phase started");
        self.progress
            .emit(SyncProgress::phase(SyncPhase::Trends, rows.len()));

        for row in &rows {
            if cancel.is_cancelled() {
                return Err(Interrupt::Cancelled);
            }
            self.repository.upsert_daily_training_load(row).await?;
            report.trends_rows += 1;
        }

        report.snapshot = FitnessSnapshot::build(&rows, &days);
        if let Some(snapshot) = &report.snapshot {
            info!(
                date = %snapshot.latest.date,
                ctl = snapshot.latest.ctl,
                atl = snapshot.latest.atl,
                tsb = snapshot.latest.tsb,
                status = ?snapshot.status,
                "trends phase finished"
            );
        }
        Ok(())
    }

    fn emit_item(
        &self,
        phase: SyncPhase,
        total: usize,
        completed: usize,
        summary: &ActivitySummary,
        result: &ItemResult,
    ) {
        let error = match result {
            ItemResult::Failed { reason } | ItemResult::Skipped { reason } => Some(reason.clone()),
            ItemResult::Success => None,
        };
        self.progress.emit(SyncProgress {
            phase,
            total,
            completed,
            current_label: Some(summary.label()),
            error,
        });
    }
}
