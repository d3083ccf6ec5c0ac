//! Copying workout logs between repositories.
//!
//! A sync walks every date in the source's metadata and produces one
//! [`SyncOutcome`] per date. Failures are reported per date and never end
//! the run early.

mod engine;
mod error;
mod options;
mod report;

pub use engine::{SyncEngine, SyncOutcome, SyncStream};
pub use error::SyncError;
pub use options::{
    SyncCancellation, SyncDirection, SyncMode, SyncOptions, DEFAULT_RETRY_ATTEMPTS,
};
pub use report::SyncReport;
