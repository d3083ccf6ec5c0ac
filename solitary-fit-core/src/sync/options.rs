use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Retries after the first write attempt, unless configured otherwise.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 2;

/// Which dates a sync copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Copy only dates the destination has no record for.
    #[default]
    Preserve,
    /// Copy every date, replacing whatever the destination holds.
    Overwrite,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Preserve => write!(f, "preserve"),
            SyncMode::Overwrite => write!(f, "overwrite"),
        }
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "preserve" => Ok(SyncMode::Preserve),
            "overwrite" => Ok(SyncMode::Overwrite),
            _ => Err(format!(
                "Invalid sync mode '{}'. Valid options: preserve, overwrite",
                s
            )),
        }
    }
}

/// Direction of a sync between the offline and online repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    /// Offline -> online.
    Upload,
    /// Online -> offline.
    Download,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDirection::Upload => write!(f, "upload"),
            SyncDirection::Download => write!(f, "download"),
        }
    }
}

/// Cooperative cancellation for a running sync.
///
/// Checked before each date starts. A date that has started still finishes
/// and reports its outcome.
#[derive(Debug, Clone, Default)]
pub struct SyncCancellation(Arc<AtomicBool>);

impl SyncCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Settings for one sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub mode: SyncMode,
    /// Write retries after the first attempt (total attempts = this + 1).
    pub retry_attempts: u32,
    /// Pause between write attempts.
    pub retry_delay: Duration,
    /// Dates processed at once. Values below 1 are treated as 1.
    pub concurrency: usize,
    pub cancellation: Option<SyncCancellation>,
}

impl SyncOptions {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: Duration::ZERO,
            concurrency: 1,
            cancellation: None,
        }
    }

    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_cancellation(mut self, cancellation: SyncCancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::new(SyncMode::default())
    }
}
