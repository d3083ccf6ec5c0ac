mod workout;
mod workout_log;

pub use workout::Workout;
pub use workout_log::{InvalidReps, WorkoutLog};
