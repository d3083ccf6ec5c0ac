use async_trait::async_trait;
use chrono::NaiveDate;
use solitary_fit_core::models::{Workout, WorkoutLog};
use solitary_fit_core::repository::{RecordIndex, RepositoryError, WorkoutLogsRepository};
use sqlx::SqlitePool;
use std::collections::BTreeMap;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Offline workout logs in the local SQLite database.
///
/// A record is the set of rows sharing a date, one per workout kind.
pub struct SqliteWorkoutLogsRepository {
    pool: SqlitePool,
    index: RecordIndex,
}

#[derive(sqlx::FromRow)]
struct RepsRow {
    workout: String,
    reps: i64,
}

impl SqliteWorkoutLogsRepository {
    /// Wraps `pool`, indexing the dates already stored.
    pub async fn open(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT DISTINCT date FROM workout_reps")
            .fetch_all(&pool)
            .await?;

        let mut dates = Vec::with_capacity(rows.len());
        for (date,) in rows {
            match NaiveDate::parse_from_str(&date, DATE_FORMAT) {
                Ok(date) => dates.push(date),
                Err(_) => tracing::warn!("Ignoring workout rows with invalid date '{}'", date),
            }
        }

        Ok(Self {
            pool,
            index: RecordIndex::from_dates(dates),
        })
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[async_trait]
impl WorkoutLogsRepository for SqliteWorkoutLogsRepository {
    async fn read_workout_log(
        &self,
        date: NaiveDate,
    ) -> Result<Option<WorkoutLog>, RepositoryError> {
        let rows: Vec<RepsRow> =
            sqlx::query_as("SELECT workout, reps FROM workout_reps WHERE date = ?")
                .bind(date_key(date))
                .fetch_all(&self.pool)
                .await
                .map_err(RepositoryError::storage)?;

        if rows.is_empty() {
            return Ok(None);
        }

        let corrupt = |reason: String| RepositoryError::Corrupt { date, reason };
        let mut reps = BTreeMap::new();
        for row in rows {
            let workout: Workout = row.workout.parse().map_err(corrupt)?;
            reps.insert(workout, row.reps);
        }
        WorkoutLog::try_from(reps)
            .map(Some)
            .map_err(|e| corrupt(e.to_string()))
    }

    async fn write_workout_log(
        &self,
        date: NaiveDate,
        log: &WorkoutLog,
    ) -> Result<(), RepositoryError> {
        let key = date_key(date);
        // Take the write lock up front so concurrent writers wait on the
        // busy timeout instead of failing to upgrade a read lock.
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(RepositoryError::storage)?;

        sqlx::query("DELETE FROM workout_reps WHERE date = ?")
            .bind(&key)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::storage)?;

        for (workout, reps) in log.iter() {
            sqlx::query("INSERT INTO workout_reps (date, workout, reps) VALUES (?, ?, ?)")
                .bind(&key)
                .bind(workout.key())
                .bind(i64::from(reps))
                .execute(&mut *tx)
                .await
                .map_err(RepositoryError::storage)?;
        }

        tx.commit().await.map_err(RepositoryError::storage)?;

        self.index.record(date);
        tracing::trace!("Wrote workout log for {}", date);
        Ok(())
    }

    async fn update_workout_log(
        &self,
        date: NaiveDate,
        workout: Workout,
        reps: u32,
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(RepositoryError::storage)?;

        // Inserts nothing when the date has no record.
        let result = sqlx::query(
            r#"
            INSERT INTO workout_reps (date, workout, reps)
            SELECT ?, ?, ? WHERE EXISTS (SELECT 1 FROM workout_reps WHERE date = ?)
            ON CONFLICT (date, workout) DO UPDATE SET reps = excluded.reps
            "#,
        )
        .bind(date_key(date))
        .bind(workout.key())
        .bind(i64::from(reps))
        .bind(date_key(date))
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::storage)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(date));
        }
        tx.commit().await.map_err(RepositoryError::storage)
    }

    fn metadata(&self) -> &RecordIndex {
        &self.index
    }
}
