//! Automerge document store for the online repository.
//!
//! Each user's workout logs live in their own directory, one document per
//! date. A document is a root map of `workout key -> count`:
//!
//! ```text
//! { "burpee": 0, "handstand_press_up": 5, "press_up": 40, ... }
//! ```
//!
//! Replicating these documents to a server is left to the sync server
//! tooling; this module only reads and writes them locally.

mod reader;
mod repository;
mod storage;
mod writer;

pub use reader::{read_workout_log, ReaderError};
pub use repository::DocumentWorkoutLogsRepository;
pub use storage::{StorageError, UserDocumentStorage};
pub use writer::{write_reps, write_workout_log, WriterError};
