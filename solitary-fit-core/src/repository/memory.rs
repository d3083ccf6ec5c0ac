use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::{RecordIndex, RepositoryError, WorkoutLogsRepository};
use crate::models::{Workout, WorkoutLog};

/// A repository that keeps logs in memory.
#[derive(Debug, Default)]
pub struct MemoryWorkoutLogsRepository {
    logs: Mutex<HashMap<NaiveDate, WorkoutLog>>,
    index: RecordIndex,
}

impl MemoryWorkoutLogsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-filled with `logs`.
    pub fn with_logs<I: IntoIterator<Item = (NaiveDate, WorkoutLog)>>(logs: I) -> Self {
        let logs: HashMap<NaiveDate, WorkoutLog> = logs.into_iter().collect();
        let index = RecordIndex::from_dates(logs.keys().copied());
        Self {
            logs: Mutex::new(logs),
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.logs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.lock().is_empty()
    }
}

#[async_trait]
impl WorkoutLogsRepository for MemoryWorkoutLogsRepository {
    async fn read_workout_log(
        &self,
        date: NaiveDate,
    ) -> Result<Option<WorkoutLog>, RepositoryError> {
        Ok(self.logs.lock().get(&date).cloned())
    }

    async fn write_workout_log(
        &self,
        date: NaiveDate,
        log: &WorkoutLog,
    ) -> Result<(), RepositoryError> {
        self.logs.lock().insert(date, log.clone());
        self.index.record(date);
        Ok(())
    }

    async fn update_workout_log(
        &self,
        date: NaiveDate,
        workout: Workout,
        reps: u32,
    ) -> Result<(), RepositoryError> {
        let mut logs = self.logs.lock();
        let log = logs.get_mut(&date).ok_or(RepositoryError::NotFound(date))?;
        *log = log.with_reps(workout, reps);
        Ok(())
    }

    fn metadata(&self) -> &RecordIndex {
        &self.index
    }
}
