//! Storage-independent access to workout logs.
//!
//! Every store (the local SQLite database, the per-user document store, the
//! in-memory store used in tests) implements [`WorkoutLogsRepository`]. The
//! rest of the application only talks to this trait, so which store is
//! active can change at runtime (see [`LazyRepositoryFactory`]).
//!
//! A date identifies at most one record per repository. Missing records are
//! `Ok(None)`, not errors.

mod factory;
mod memory;
mod metadata;

pub use factory::{LazyRepositoryFactory, RepositoryProvider};
pub use memory::MemoryWorkoutLogsRepository;
pub use metadata::{RecordIndex, Records};

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Workout, WorkoutLog};

/// Errors returned by repository operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// `update_workout_log` was called for a date with no record.
    #[error("No workout log recorded for {0}")]
    NotFound(NaiveDate),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Stored workout log for {date} is corrupt: {reason}")]
    Corrupt { date: NaiveDate, reason: String },

    #[error("No user is signed in")]
    NotSignedIn,
}

impl RepositoryError {
    pub fn storage(e: impl std::fmt::Display) -> Self {
        RepositoryError::Storage(e.to_string())
    }
}

/// A store of workout logs keyed by date.
///
/// Writes have landed durably once the returned future resolves, and the
/// date is visible in [`metadata`](Self::metadata) from then on.
#[async_trait]
pub trait WorkoutLogsRepository: Send + Sync {
    /// Reads the log for `date`, or `None` if nothing was recorded.
    async fn read_workout_log(&self, date: NaiveDate)
        -> Result<Option<WorkoutLog>, RepositoryError>;

    /// Creates or fully replaces the log for `date`.
    async fn write_workout_log(
        &self,
        date: NaiveDate,
        log: &WorkoutLog,
    ) -> Result<(), RepositoryError>;

    /// Sets one workout's count on an existing record.
    ///
    /// Fails with [`RepositoryError::NotFound`] when `date` has no record;
    /// it never creates one.
    async fn update_workout_log(
        &self,
        date: NaiveDate,
        workout: Workout,
        reps: u32,
    ) -> Result<(), RepositoryError>;

    /// Index of the dates this repository holds records for.
    fn metadata(&self) -> &RecordIndex;
}
