//! Writers for serializing workout logs into Automerge documents.
//!
//! A workout log document is a flat root map of `workout key -> count`.

use automerge::{transaction::Transactable, AutoCommit, AutomergeError, ROOT};
use thiserror::Error;

use crate::models::{Workout, WorkoutLog};

/// Errors that can occur while writing a document.
#[derive(Error, Debug)]
#[error("Automerge write failed: {0}")]
pub struct WriterError(#[from] AutomergeError);

/// Writes every workout count of `log` into `doc`, zeros included.
pub fn write_workout_log(doc: &mut AutoCommit, log: &WorkoutLog) -> Result<(), WriterError> {
    for (workout, reps) in log.iter() {
        write_reps(doc, workout, reps)?;
    }
    Ok(())
}

/// Sets a single workout count, leaving the other fields untouched.
pub fn write_reps(doc: &mut AutoCommit, workout: Workout, reps: u32) -> Result<(), WriterError> {
    doc.put(ROOT, workout.key(), i64::from(reps))?;
    Ok(())
}
