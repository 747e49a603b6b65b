// ABOUTME: Storage repository abstraction for summaries, streams, metrics, and training load
// ABOUTME: Idempotent async operations with in-memory and SQLite implementations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Sync Repository
//!
//! Every write is idempotent on its key so a sync interrupted mid-phase can
//! simply run again. The persisted watermark plus the `streams_fetched` flag
//! and metrics staleness together form the resumable sync cursor.

/// Map-backed repository for tests and dry runs
pub mod memory;
/// SQLite repository using sqlx
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fitness_core::errors::database::{DatabaseError, DatabaseResult};
use fitness_core::models::{
    ActivityId, ActivityMetrics, ActivitySummary, DailyImpulse, DailyTrainingLoad, StreamSample,
};
use std::sync::Arc;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

/// URL selecting the in-memory repository
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Persistence operations used by the sync pipeline
#[async_trait]
pub trait SyncRepository: Send + Sync {
    /// Insert or update a summary by id; never clears `streams_fetched`
    async fn upsert_activity_summary(&self, summary: &ActivitySummary) -> DatabaseResult<()>;

    /// Look up one summary
    async fn get_activity_summary(
        &self,
        activity_id: ActivityId,
    ) -> DatabaseResult<Option<ActivitySummary>>;

    /// Every stored summary, oldest first
    async fn list_activity_summaries(&self) -> DatabaseResult<Vec<ActivitySummary>>;

    /// Eligible summaries without a persisted stream, oldest first
    async fn get_stream_sync_candidates(
        &self,
        limit: usize,
    ) -> DatabaseResult<Vec<ActivitySummary>>;

    /// Replace the stored stream for an activity
    async fn save_stream(&self, activity_id: ActivityId, stream: &[StreamSample])
        -> DatabaseResult<()>;

    /// Flag the activity as having a persisted stream
    async fn mark_stream_synced(&self, activity_id: ActivityId) -> DatabaseResult<()>;

    /// Activities with a stream and no metrics row, or a row older than the stream
    async fn get_metrics_candidates(&self) -> DatabaseResult<Vec<ActivitySummary>>;

    /// Stored stream in time order
    ///
    /// Returns `DatabaseError::NotFound` when no stream was saved.
    async fn get_stream(&self, activity_id: ActivityId) -> DatabaseResult<Vec<StreamSample>>;

    /// Insert or replace the metrics row for an activity
    async fn save_activity_metrics(&self, metrics: &ActivityMetrics) -> DatabaseResult<()>;

    /// Metrics row for one activity
    async fn get_activity_metrics(
        &self,
        activity_id: ActivityId,
    ) -> DatabaseResult<Option<ActivityMetrics>>;

    /// Impulse, distance, and efficiency per local date across the full history
    async fn get_all_daily_impulse(&self) -> DatabaseResult<Vec<DailyImpulse>>;

    /// Insert or overwrite the load row for its date
    async fn upsert_daily_training_load(&self, row: &DailyTrainingLoad) -> DatabaseResult<()>;

    /// Every stored load row in date order
    async fn get_daily_training_loads(&self) -> DatabaseResult<Vec<DailyTrainingLoad>>;

    /// Instant up to which summaries are known to be fully fetched
    async fn get_sync_watermark(&self) -> DatabaseResult<Option<DateTime<Utc>>>;

    /// Advance the summary watermark
    async fn set_sync_watermark(&self, watermark: DateTime<Utc>) -> DatabaseResult<()>;
}

/// Open the repository selected by `database_url`
///
/// `memory` selects [`InMemoryRepository`]; `sqlite:` URLs open a
/// [`SqliteRepository`].
///
/// # Errors
///
/// Returns `DatabaseError::ConnectionError` for any other scheme or if the
/// SQLite database cannot be opened
pub async fn open_repository(database_url: &str) -> DatabaseResult<Arc<dyn SyncRepository>> {
    if database_url == MEMORY_DATABASE_URL {
        return Ok(Arc::new(InMemoryRepository::new()));
    }
    if !database_url.starts_with("sqlite:") {
        return Err(DatabaseError::ConnectionError(format!(
            "unsupported database URL: {database_url}"
        )));
    }
    Ok(Arc::new(SqliteRepository::connect(database_url).await?))
}

/// Accumulate one activity into its day's aggregate
pub(crate) fn accumulate_day(
    day: &mut DailyImpulse,
    summary: &ActivitySummary,
    metrics: &ActivityMetrics,
) {
    day.training_impulse += metrics.training_impulse;
    day.distance_meters += summary.distance_meters;
    day.activity_count += 1;
    if metrics.efficiency_factor > 0.0 {
        day.efficiency_sum += metrics.efficiency_factor;
        day.efficiency_count += 1;
    }
}
