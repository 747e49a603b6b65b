// ABOUTME: SQLite sync repository built on an sqlx connection pool
// ABOUTME: Idempotent upserts keyed by activity id and date, with schema created on connect
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{accumulate_day, SyncRepository};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use fitness_core::errors::database::{DatabaseError, DatabaseResult};
use fitness_core::models::{
    ActivityId, ActivityMetrics, ActivitySummary, DailyImpulse, DailyTrainingLoad, StreamSample,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info};

const SUMMARY_COLUMNS: &str = "id, name, sport_type, start_date, start_date_local, \
     moving_time_secs, elapsed_time_secs, distance_meters, average_speed, max_speed, \
     average_heart_rate, max_heart_rate, average_cadence, has_heartrate, streams_fetched";

const SCHEMA: [&str; 6] = [
    r"
    CREATE TABLE IF NOT EXISTS activities (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        sport_type TEXT NOT NULL,
        start_date TEXT NOT NULL,
        start_date_local TEXT NOT NULL,
        moving_time_secs INTEGER NOT NULL,
        elapsed_time_secs INTEGER NOT NULL,
        distance_meters REAL NOT NULL,
        average_speed REAL NOT NULL,
        max_speed REAL NOT NULL,
        average_heart_rate REAL,
        max_heart_rate REAL,
        average_cadence REAL,
        has_heartrate INTEGER NOT NULL,
        streams_fetched INTEGER NOT NULL DEFAULT 0
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS streams (
        activity_id INTEGER PRIMARY KEY,
        sample_count INTEGER NOT NULL,
        fetched_at TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS stream_samples (
        activity_id INTEGER NOT NULL,
        time_offset INTEGER NOT NULL,
        latitude REAL,
        longitude REAL,
        altitude REAL,
        velocity REAL,
        heart_rate REAL,
        cadence REAL,
        grade REAL,
        distance REAL,
        PRIMARY KEY (activity_id, time_offset)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS activity_metrics (
        activity_id INTEGER PRIMARY KEY,
        efficiency_factor REAL NOT NULL,
        normalized_efficiency_factor REAL NOT NULL,
        aerobic_decoupling REAL NOT NULL,
        cardiac_drift REAL NOT NULL,
        training_impulse REAL NOT NULL,
        stress_score REAL NOT NULL,
        data_quality REAL NOT NULL,
        computed_at TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS daily_training_load (
        date TEXT PRIMARY KEY,
        daily_impulse REAL NOT NULL,
        ctl REAL NOT NULL,
        atl REAL NOT NULL,
        tsb REAL NOT NULL,
        distance_7d_meters REAL NOT NULL,
        efficiency_7d REAL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS sync_state (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        summary_watermark TEXT
    )
    ",
];

/// Repository persisting sync state to SQLite
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open (creating if needed) the database at `database_url` and run migrations
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::ConnectionError` if the URL is invalid or the file
    /// cannot be opened, and `QueryError` if the schema cannot be created
    pub async fn connect(database_url: &str) -> DatabaseResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?
            .create_if_missing(true);

        // An in-memory database exists per connection
        let max_connections = if database_url.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        let repository = Self { pool };
        repository.migrate().await?;
        info!(database_url, "sqlite repository ready");
        Ok(repository)
    }

    /// Create tables if they do not exist
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::QueryError` if a statement fails
    pub async fn migrate(&self) -> DatabaseResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::QueryError {
                    context: format!("schema migration failed: {e}"),
                })?;
        }
        Ok(())
    }

    async fn fetch_summaries(&self, filter: &str) -> DatabaseResult<Vec<ActivitySummary>> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM activities {filter} ORDER BY start_date ASC, id ASC"
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError {
                context: format!("failed to list activities: {e}"),
            })?;
        rows.iter().map(summary_from_row).collect()
    }
}

fn to_db_id(activity_id: ActivityId) -> DatabaseResult<i64> {
    i64::try_from(activity_id).map_err(|_| {
        DatabaseError::SerializationError(format!("activity id {activity_id} exceeds i64 range"))
    })
}

fn from_db_id(value: i64) -> DatabaseResult<ActivityId> {
    ActivityId::try_from(value)
        .map_err(|_| DatabaseError::SerializationError(format!("negative activity id {value}")))
}

fn to_db_secs(value: u64) -> DatabaseResult<i64> {
    i64::try_from(value)
        .map_err(|_| DatabaseError::SerializationError(format!("duration {value} out of range")))
}

fn from_db_secs(value: i64) -> DatabaseResult<u64> {
    u64::try_from(value)
        .map_err(|_| DatabaseError::SerializationError(format!("negative duration {value}")))
}

fn from_db_count(value: i64) -> DatabaseResult<u32> {
    u32::try_from(value)
        .map_err(|_| DatabaseError::SerializationError(format!("count {value} out of range")))
}

fn summary_from_row(row: &SqliteRow) -> DatabaseResult<ActivitySummary> {
    Ok(ActivitySummary {
        id: from_db_id(row.try_get("id")?)?,
        name: row.try_get("name")?,
        sport_type: row.try_get("sport_type")?,
        start_date: row.try_get::<DateTime<Utc>, _>("start_date")?,
        start_date_local: row.try_get::<NaiveDateTime, _>("start_date_local")?,
        moving_time_secs: from_db_secs(row.try_get("moving_time_secs")?)?,
        elapsed_time_secs: from_db_secs(row.try_get("elapsed_time_secs")?)?,
        distance_meters: row.try_get("distance_meters")?,
        average_speed: row.try_get("average_speed")?,
        max_speed: row.try_get("max_speed")?,
        average_heart_rate: row.try_get("average_heart_rate")?,
        max_heart_rate: row.try_get("max_heart_rate")?,
        average_cadence: row.try_get("average_cadence")?,
        has_heartrate: row.try_get("has_heartrate")?,
        streams_fetched: row.try_get("streams_fetched")?,
    })
}

fn metrics_from_row(row: &SqliteRow) -> DatabaseResult<ActivityMetrics> {
    Ok(ActivityMetrics {
        activity_id: from_db_id(row.try_get("activity_id")?)?,
        efficiency_factor: row.try_get("efficiency_factor")?,
        normalized_efficiency_factor: row.try_get("normalized_efficiency_factor")?,
        aerobic_decoupling: row.try_get("aerobic_decoupling")?,
        cardiac_drift: row.try_get("cardiac_drift")?,
        training_impulse: row.try_get("training_impulse")?,
        stress_score: row.try_get("stress_score")?,
        data_quality: row.try_get("data_quality")?,
        computed_at: row.try_get("computed_at")?,
    })
}

fn sample_from_row(row: &SqliteRow) -> DatabaseResult<StreamSample> {
    let time_offset: i64 = row.try_get("time_offset")?;
    Ok(StreamSample {
        time_offset: u32::try_from(time_offset).map_err(|_| {
            DatabaseError::SerializationError(format!("time offset {time_offset} out of range"))
        })?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        altitude: row.try_get("altitude")?,
        velocity: row.try_get("velocity")?,
        heart_rate: row.try_get("heart_rate")?,
        cadence: row.try_get("cadence")?,
        grade: row.try_get("grade")?,
        distance: row.try_get("distance")?,
    })
}

fn load_from_row(row: &SqliteRow) -> DatabaseResult<DailyTrainingLoad> {
    Ok(DailyTrainingLoad {
        date: row.try_get::<NaiveDate, _>("date")?,
        daily_impulse: row.try_get("daily_impulse")?,
        ctl: row.try_get("ctl")?,
        atl: row.try_get("atl")?,
        tsb: row.try_get("tsb")?,
        distance_7d_meters: row.try_get("distance_7d_meters")?,
        efficiency_7d: row.try_get("efficiency_7d")?,
    })
}

#[async_trait]
impl SyncRepository for SqliteRepository {
    async fn upsert_activity_summary(&self, summary: &ActivitySummary) -> DatabaseResult<()> {
        sqlx::query(
            r"
            INSERT INTO activities (
                id, name, sport_type, start_date, start_date_local,
                moving_time_secs, elapsed_time_secs, distance_meters, average_speed, max_speed,
                average_heart_rate, max_heart_rate, average_cadence, has_heartrate, streams_fetched
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                sport_type = excluded.sport_type,
                start_date = excluded.start_date,
                start_date_local = excluded.start_date_local,
                moving_time_secs = excluded.moving_time_secs,
                elapsed_time_secs = excluded.elapsed_time_secs,
                distance_meters = excluded.distance_meters,
                average_speed = excluded.average_speed,
                max_speed = excluded.max_speed,
                average_heart_rate = excluded.average_heart_rate,
                max_heart_rate = excluded.max_heart_rate,
                average_cadence = excluded.average_cadence,
                has_heartrate = excluded.has_heartrate,
                streams_fetched = MAX(activities.streams_fetched, excluded.streams_fetched)
            ",
        )
        .bind(to_db_id(summary.id)?)
        .bind(&summary.name)
        .bind(&summary.sport_type)
        .bind(summary.start_date)
        .bind(summary.start_date_local)
        .bind(to_db_secs(summary.moving_time_secs)?)
        .bind(to_db_secs(summary.elapsed_time_secs)?)
        .bind(summary.distance_meters)
        .bind(summary.average_speed)
        .bind(summary.max_speed)
        .bind(summary.average_heart_rate)
        .bind(summary.max_heart_rate)
        .bind(summary.average_cadence)
        .bind(summary.has_heartrate)
        .bind(summary.streams_fetched)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError {
            context: format!("failed to upsert activity {}: {e}", summary.id),
        })?;
        Ok(())
    }

    async fn get_activity_summary(
        &self,
        activity_id: ActivityId,
    ) -> DatabaseResult<Option<ActivitySummary>> {
        let query = format!("SELECT {SUMMARY_COLUMNS} FROM activities WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(to_db_id(activity_id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError {
                context: format!("failed to load activity {activity_id}: {e}"),
            })?;
        row.as_ref().map(summary_from_row).transpose()
    }

    async fn list_activity_summaries(&self) -> DatabaseResult<Vec<ActivitySummary>> {
        self.fetch_summaries("").await
    }

    async fn get_stream_sync_candidates(
        &self,
        limit: usize,
    ) -> DatabaseResult<Vec<ActivitySummary>> {
        // Eligibility lives on the model; the SQL filter only narrows the scan
        let mut candidates: Vec<ActivitySummary> = self
            .fetch_summaries("WHERE streams_fetched = 0 AND has_heartrate = 1")
            .await?
            .into_iter()
            .filter(ActivitySummary::is_eligible)
            .collect();
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn save_stream(
        &self,
        activity_id: ActivityId,
        stream: &[StreamSample],
    ) -> DatabaseResult<()> {
        let id = to_db_id(activity_id)?;
        let query_error = |e: sqlx::Error| DatabaseError::QueryError {
            context: format!("failed to save stream for activity {activity_id}: {e}"),
        };

        let mut tx = self.pool.begin().await.map_err(query_error)?;

        sqlx::query("DELETE FROM stream_samples WHERE activity_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;

        for sample in stream {
            sqlx::query(
                r"
                INSERT OR REPLACE INTO stream_samples (
                    activity_id, time_offset, latitude, longitude, altitude,
                    velocity, heart_rate, cadence, grade, distance
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ",
            )
            .bind(id)
            .bind(i64::from(sample.time_offset))
            .bind(sample.latitude)
            .bind(sample.longitude)
            .bind(sample.altitude)
            .bind(sample.velocity)
            .bind(sample.heart_rate)
            .bind(sample.cadence)
            .bind(sample.grade)
            .bind(sample.distance)
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;
        }

        sqlx::query(
            r"
            INSERT INTO streams (activity_id, sample_count, fetched_at) VALUES ($1, $2, $3)
            ON CONFLICT(activity_id) DO UPDATE SET
                sample_count = excluded.sample_count,
                fetched_at = excluded.fetched_at
            ",
        )
        .bind(id)
        .bind(i64::try_from(stream.len()).unwrap_or(i64::MAX))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        tx.commit().await.map_err(query_error)?;
        debug!(activity_id, samples = stream.len(), "stream saved");
        Ok(())
    }

    async fn mark_stream_synced(&self, activity_id: ActivityId) -> DatabaseResult<()> {
        let result = sqlx::query("UPDATE activities SET streams_fetched = 1 WHERE id = $1")
            .bind(to_db_id(activity_id)?)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError {
                context: format!("failed to mark stream synced for {activity_id}: {e}"),
            })?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                entity: "activity",
                id: activity_id.to_string(),
            });
        }
        Ok(())
    }

    async fn get_metrics_candidates(&self) -> DatabaseResult<Vec<ActivitySummary>> {
        let rows = sqlx::query(
            r"
            SELECT a.id, s.fetched_at, m.computed_at
            FROM activities a
            JOIN streams s ON s.activity_id = a.id
            LEFT JOIN activity_metrics m ON m.activity_id = a.id
            WHERE a.streams_fetched = 1
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError {
            context: format!("failed to list metrics candidates: {e}"),
        })?;

        let mut stale = Vec::new();
        for row in &rows {
            let fetched_at: DateTime<Utc> = row.try_get("fetched_at")?;
            let computed_at: Option<DateTime<Utc>> = row.try_get("computed_at")?;
            if computed_at.is_none_or(|computed| computed < fetched_at) {
                stale.push(from_db_id(row.try_get("id")?)?);
            }
        }

        Ok(self
            .fetch_summaries("WHERE streams_fetched = 1")
            .await?
            .into_iter()
            .filter(|summary| stale.contains(&summary.id))
            .collect())
    }

    async fn get_stream(&self, activity_id: ActivityId) -> DatabaseResult<Vec<StreamSample>> {
        let id = to_db_id(activity_id)?;
        let exists = sqlx::query("SELECT 1 FROM streams WHERE activity_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError {
                context: format!("failed to load stream for {activity_id}: {e}"),
            })?;
        if exists.is_none() {
            return Err(DatabaseError::NotFound {
                entity: "stream",
                id: activity_id.to_string(),
            });
        }

        let rows = sqlx::query(
            r"
            SELECT time_offset, latitude, longitude, altitude, velocity,
                   heart_rate, cadence, grade, distance
            FROM stream_samples
            WHERE activity_id = $1
            ORDER BY time_offset ASC
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError {
            context: format!("failed to load stream samples for {activity_id}: {e}"),
        })?;

        rows.iter().map(sample_from_row).collect()
    }

    async fn save_activity_metrics(&self, metrics: &ActivityMetrics) -> DatabaseResult<()> {
        sqlx::query(
            r"
            INSERT INTO activity_metrics (
                activity_id, efficiency_factor, normalized_efficiency_factor, aerobic_decoupling,
                cardiac_drift, training_impulse, stress_score, data_quality, computed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT(activity_id) DO UPDATE SET
                efficiency_factor = excluded.efficiency_factor,
                normalized_efficiency_factor = excluded.normalized_efficiency_factor,
                aerobic_decoupling = excluded.aerobic_decoupling,
                cardiac_drift = excluded.cardiac_drift,
                training_impulse = excluded.training_impulse,
                stress_score = excluded.stress_score,
                data_quality = excluded.data_quality,
                computed_at = excluded.computed_at
            ",
        )
        .bind(to_db_id(metrics.activity_id)?)
        .bind(metrics.efficiency_factor)
        .bind(metrics.normalized_efficiency_factor)
        .bind(metrics.aerobic_decoupling)
        .bind(metrics.cardiac_drift)
        .bind(metrics.training_impulse)
        .bind(metrics.stress_score)
        .bind(metrics.data_quality)
        .bind(metrics.computed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError {
            context: format!("failed to save metrics for {}: {e}", metrics.activity_id),
        })?;
        Ok(())
    }

    async fn get_activity_metrics(
        &self,
        activity_id: ActivityId,
    ) -> DatabaseResult<Option<ActivityMetrics>> {
        let row = sqlx::query("SELECT * FROM activity_metrics WHERE activity_id = $1")
            .bind(to_db_id(activity_id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError {
                context: format!("failed to load metrics for {activity_id}: {e}"),
            })?;
        row.as_ref().map(metrics_from_row).transpose()
    }

    async fn get_all_daily_impulse(&self) -> DatabaseResult<Vec<DailyImpulse>> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS}, m.activity_id, m.efficiency_factor, \
             m.normalized_efficiency_factor, m.aerobic_decoupling, m.cardiac_drift, \
             m.training_impulse, m.stress_score, m.data_quality, m.computed_at \
             FROM activity_metrics m JOIN activities a ON a.id = m.activity_id"
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError {
                context: format!("failed to aggregate daily impulse: {e}"),
            })?;

        let mut days: BTreeMap<NaiveDate, DailyImpulse> = BTreeMap::new();
        for row in &rows {
            let summary = summary_from_row(row)?;
            let metrics = metrics_from_row(row)?;
            let date = summary.local_date();
            let day = days.entry(date).or_insert_with(|| DailyImpulse {
                date,
                training_impulse: 0.0,
                distance_meters: 0.0,
                efficiency_sum: 0.0,
                efficiency_count: 0,
                activity_count: 0,
            });
            accumulate_day(day, &summary, &metrics);
        }
        Ok(days.into_values().collect())
    }

    async fn upsert_daily_training_load(&self, row: &DailyTrainingLoad) -> DatabaseResult<()> {
        sqlx::query(
            r"
            INSERT INTO daily_training_load (
                date, daily_impulse, ctl, atl, tsb, distance_7d_meters, efficiency_7d
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT(date) DO UPDATE SET
                daily_impulse = excluded.daily_impulse,
                ctl = excluded.ctl,
                atl = excluded.atl,
                tsb = excluded.tsb,
                distance_7d_meters = excluded.distance_7d_meters,
                efficiency_7d = excluded.efficiency_7d
            ",
        )
        .bind(row.date)
        .bind(row.daily_impulse)
        .bind(row.ctl)
        .bind(row.atl)
        .bind(row.tsb)
        .bind(row.distance_7d_meters)
        .bind(row.efficiency_7d)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError {
            context: format!("failed to upsert training load for {}: {e}", row.date),
        })?;
        Ok(())
    }

    async fn get_daily_training_loads(&self) -> DatabaseResult<Vec<DailyTrainingLoad>> {
        let rows = sqlx::query("SELECT * FROM daily_training_load ORDER BY date ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError {
                context: format!("failed to list training load: {e}"),
            })?;
        rows.iter().map(load_from_row).collect()
    }

    async fn get_sync_watermark(&self) -> DatabaseResult<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT summary_watermark FROM sync_state WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError {
                context: format!("failed to read sync watermark: {e}"),
            })?;
        match row {
            Some(row) => Ok(row.try_get("summary_watermark")?),
            None => Ok(None),
        }
    }

    async fn set_sync_watermark(&self, watermark: DateTime<Utc>) -> DatabaseResult<()> {
        sqlx::query(
            r"
            INSERT INTO sync_state (id, summary_watermark) VALUES (1, $1)
            ON CONFLICT(id) DO UPDATE SET summary_watermark = excluded.summary_watermark
            ",
        )
        .bind(watermark)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError {
            context: format!("failed to write sync watermark: {e}"),
        })?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_conversion_rejects_out_of_range() {
        assert!(to_db_id(u64::MAX).is_err());
        assert_eq!(to_db_id(42).unwrap(), 42);
        assert!(from_db_id(-1).is_err());
    }
}
