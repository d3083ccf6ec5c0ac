//! Solitary Fit Core Library
//!
//! Workout log models, the repositories that store them, and the sync
//! engine that copies logs between the offline and online stores.

pub mod automerge;
pub mod identity;
pub mod models;
pub mod outcome;
pub mod repository;
pub mod sync;

pub use automerge::{DocumentWorkoutLogsRepository, StorageError, UserDocumentStorage};
pub use identity::{IdentityState, User};
pub use models::{InvalidReps, Workout, WorkoutLog};
pub use outcome::Outcome;
pub use repository::{
    LazyRepositoryFactory, MemoryWorkoutLogsRepository, RecordIndex, RepositoryError,
    WorkoutLogsRepository,
};
pub use sync::{
    SyncCancellation, SyncDirection, SyncEngine, SyncError, SyncMode, SyncOptions, SyncOutcome,
    SyncReport,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
