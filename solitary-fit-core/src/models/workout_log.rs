use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;
use thiserror::Error;

use super::workout::Workout;

/// A repetition count that cannot be stored in a [`WorkoutLog`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidReps {
    #[error("{workout} cannot have a negative rep count ({reps})")]
    Negative { workout: Workout, reps: i64 },

    #[error("{workout} rep count {reps} is too large")]
    TooLarge { workout: Workout, reps: i64 },
}

/// Repetitions per workout for a single day.
///
/// Immutable: every change produces a new log, so a log handed to another
/// task can never be observed half-updated. Workouts that were never set
/// count as zero, which makes two logs with the same counts equal however
/// they were built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "BTreeMap<Workout, u32>", try_from = "BTreeMap<Workout, i64>")]
pub struct WorkoutLog {
    reps: [u32; Workout::COUNT],
}

impl WorkoutLog {
    /// An empty log (every workout at zero).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a log from untrusted counts, rejecting negative values.
    pub fn from_reps<I>(reps: I) -> Result<Self, InvalidReps>
    where
        I: IntoIterator<Item = (Workout, i64)>,
    {
        reps.into_iter()
            .try_fold(Self::new(), |log, (workout, count)| {
                log.try_with_reps(workout, count)
            })
    }

    pub fn get(&self, workout: Workout) -> u32 {
        self.reps[workout.index()]
    }

    /// Returns a copy of this log with `workout` set to `reps`.
    pub fn with_reps(&self, workout: Workout, reps: u32) -> Self {
        let mut next = self.clone();
        next.reps[workout.index()] = reps;
        next
    }

    /// Like [`with_reps`](Self::with_reps), for counts coming from storage or user input.
    pub fn try_with_reps(&self, workout: Workout, reps: i64) -> Result<Self, InvalidReps> {
        if reps < 0 {
            return Err(InvalidReps::Negative { workout, reps });
        }
        let reps = u32::try_from(reps).map_err(|_| InvalidReps::TooLarge { workout, reps })?;
        Ok(self.with_reps(workout, reps))
    }

    /// Returns a copy with `quantity` added to `workout`, saturating at `u32::MAX`.
    pub fn incremented(&self, workout: Workout, quantity: u32) -> Self {
        self.with_reps(workout, self.get(workout).saturating_add(quantity))
    }

    /// Iterates every workout with its count, zeros included.
    pub fn iter(&self) -> impl Iterator<Item = (Workout, u32)> + '_ {
        Workout::ALL.into_iter().map(|w| (w, self.get(w)))
    }

    pub fn total(&self) -> u64 {
        self.reps.iter().map(|&r| u64::from(r)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.reps.iter().all(|&r| r == 0)
    }
}

impl Index<Workout> for WorkoutLog {
    type Output = u32;

    fn index(&self, workout: Workout) -> &u32 {
        &self.reps[workout.index()]
    }
}

impl FromIterator<(Workout, u32)> for WorkoutLog {
    fn from_iter<T: IntoIterator<Item = (Workout, u32)>>(iter: T) -> Self {
        let mut reps = [0; Workout::COUNT];
        for (workout, count) in iter {
            reps[workout.index()] = count;
        }
        Self { reps }
    }
}

impl From<WorkoutLog> for BTreeMap<Workout, u32> {
    fn from(log: WorkoutLog) -> Self {
        log.iter().collect()
    }
}

impl TryFrom<BTreeMap<Workout, i64>> for WorkoutLog {
    type Error = InvalidReps;

    fn try_from(map: BTreeMap<Workout, i64>) -> Result<Self, Self::Error> {
        Self::from_reps(map)
    }
}

impl fmt::Display for WorkoutLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (workout, reps) in self.iter() {
            writeln!(f, "{:<20} {:>6}", workout.display_name(), reps)?;
        }
        write!(f, "{:<20} {:>6}", "Total", self.total())
    }
}
