// ABOUTME: In-memory sync repository backed by ordered maps behind an async lock
// ABOUTME: Same semantics as the SQLite repository, used for tests and the `memory` URL
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{accumulate_day, SyncRepository};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fitness_core::errors::database::{DatabaseError, DatabaseResult};
use fitness_core::models::{
    sort_by_time_offset, ActivityId, ActivityMetrics, ActivitySummary, DailyImpulse,
    DailyTrainingLoad, StreamSample,
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug)]
struct StoredStream {
    samples: Vec<StreamSample>,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Store {
    summaries: HashMap<ActivityId, ActivitySummary>,
    streams: HashMap<ActivityId, StoredStream>,
    metrics: HashMap<ActivityId, ActivityMetrics>,
    loads: BTreeMap<NaiveDate, DailyTrainingLoad>,
    watermark: Option<DateTime<Utc>>,
}

impl Store {
    fn ordered_summaries<F>(&self, keep: F) -> Vec<ActivitySummary>
    where
        F: Fn(&ActivitySummary) -> bool,
    {
        let mut selected: Vec<ActivitySummary> = self
            .summaries
            .values()
            .filter(|summary| keep(summary))
            .cloned()
            .collect();
        selected.sort_by_key(|summary| (summary.start_date, summary.id));
        selected
    }

    fn metrics_stale(&self, activity_id: ActivityId) -> bool {
        let Some(stream) = self.streams.get(&activity_id) else {
            return false;
        };
        self.metrics
            .get(&activity_id)
            .is_none_or(|metrics| metrics.computed_at < stream.fetched_at)
    }
}

/// Repository held entirely in process memory
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncRepository for InMemoryRepository {
    async fn upsert_activity_summary(&self, summary: &ActivitySummary) -> DatabaseResult<()> {
        let mut store = self.store.write().await;
        let streams_fetched = store
            .summaries
            .get(&summary.id)
            .is_some_and(|existing| existing.streams_fetched)
            || summary.streams_fetched;
        store.summaries.insert(
            summary.id,
            ActivitySummary {
                streams_fetched,
                ..summary.clone()
            },
        );
        Ok(())
    }

    async fn get_activity_summary(
        &self,
        activity_id: ActivityId,
    ) -> DatabaseResult<Option<ActivitySummary>> {
        Ok(self.store.read().await.summaries.get(&activity_id).cloned())
    }

    async fn list_activity_summaries(&self) -> DatabaseResult<Vec<ActivitySummary>> {
        Ok(self.store.read().await.ordered_summaries(|_| true))
    }

    async fn get_stream_sync_candidates(
        &self,
        limit: usize,
    ) -> DatabaseResult<Vec<ActivitySummary>> {
        let store = self.store.read().await;
        let mut candidates =
            store.ordered_summaries(|summary| summary.is_eligible() && !summary.streams_fetched);
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn save_stream(
        &self,
        activity_id: ActivityId,
        stream: &[StreamSample],
    ) -> DatabaseResult<()> {
        let mut samples = stream.to_vec();
        sort_by_time_offset(&mut samples);
        samples.dedup_by_key(|sample| sample.time_offset);
        self.store.write().await.streams.insert(
            activity_id,
            StoredStream {
                samples,
                fetched_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn mark_stream_synced(&self, activity_id: ActivityId) -> DatabaseResult<()> {
        let mut store = self.store.write().await;
        let summary =
            store
                .summaries
                .get_mut(&activity_id)
                .ok_or_else(|| DatabaseError::NotFound {
                    entity: "activity",
                    id: activity_id.to_string(),
                })?;
        summary.streams_fetched = true;
        Ok(())
    }

    async fn get_metrics_candidates(&self) -> DatabaseResult<Vec<ActivitySummary>> {
        let store = self.store.read().await;
        Ok(store.ordered_summaries(|summary| {
            summary.streams_fetched && store.metrics_stale(summary.id)
        }))
    }

    async fn get_stream(&self, activity_id: ActivityId) -> DatabaseResult<Vec<StreamSample>> {
        self.store
            .read()
            .await
            .streams
            .get(&activity_id)
            .map(|stream| stream.samples.clone())
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "stream",
                id: activity_id.to_string(),
            })
    }

    async fn save_activity_metrics(&self, metrics: &ActivityMetrics) -> DatabaseResult<()> {
        self.store
            .write()
            .await
            .metrics
            .insert(metrics.activity_id, metrics.clone());
        Ok(())
    }

    async fn get_activity_metrics(
        &self,
        activity_id: ActivityId,
    ) -> DatabaseResult<Option<ActivityMetrics>> {
        Ok(self.store.read().await.metrics.get(&activity_id).cloned())
    }

    async fn get_all_daily_impulse(&self) -> DatabaseResult<Vec<DailyImpulse>> {
        let store = self.store.read().await;
        let mut days: BTreeMap<NaiveDate, DailyImpulse> = BTreeMap::new();

        for metrics in store.metrics.values() {
            let Some(summary) = store.summaries.get(&metrics.activity_id) else {
                continue;
            };
            let date = summary.local_date();
            let day = days.entry(date).or_insert_with(|| DailyImpulse {
                date,
                training_impulse: 0.0,
                distance_meters: 0.0,
                efficiency_sum: 0.0,
                efficiency_count: 0,
                activity_count: 0,
            });
            accumulate_day(day, summary, metrics);
        }

        Ok(days.into_values().collect())
    }

    async fn upsert_daily_training_load(&self, row: &DailyTrainingLoad) -> DatabaseResult<()> {
        self.store.write().await.loads.insert(row.date, row.clone());
        Ok(())
    }

    async fn get_daily_training_loads(&self) -> DatabaseResult<Vec<DailyTrainingLoad>> {
        Ok(self.store.read().await.loads.values().cloned().collect())
    }

    async fn get_sync_watermark(&self) -> DatabaseResult<Option<DateTime<Utc>>> {
        Ok(self.store.read().await.watermark)
    }

    async fn set_sync_watermark(&self, watermark: DateTime<Utc>) -> DatabaseResult<()> {
        self.store.write().await.watermark = Some(watermark);
        Ok(())
    }
}
