//! Readers for workout log documents.

use automerge::{AutoCommit, ReadDoc, ROOT};
use thiserror::Error;

use crate::models::{InvalidReps, Workout, WorkoutLog};

/// Error type for reader operations.
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Automerge error: {0}")]
    AutomergeError(String),

    #[error("Field '{0}' is not an integer")]
    NotAnInteger(&'static str),

    #[error(transparent)]
    InvalidReps(#[from] InvalidReps),
}

/// Reads a workout log from a document. Missing fields count as zero.
pub fn read_workout_log(doc: &AutoCommit) -> Result<WorkoutLog, ReaderError> {
    let mut log = WorkoutLog::new();

    for workout in Workout::ALL {
        if let Some(reps) = get_i64(doc, workout.key())? {
            log = log.try_with_reps(workout, reps)?;
        }
    }

    Ok(log)
}

fn get_i64(doc: &AutoCommit, key: &'static str) -> Result<Option<i64>, ReaderError> {
    match doc
        .get(ROOT, key)
        .map_err(|e| ReaderError::AutomergeError(e.to_string()))?
    {
        Some((value, _)) => value
            .to_i64()
            .map(Some)
            .ok_or(ReaderError::NotAnInteger(key)),
        None => Ok(None),
    }
}
