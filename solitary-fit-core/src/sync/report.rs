use chrono::NaiveDate;
use futures::{Stream, StreamExt};
use std::fmt;

use super::engine::SyncOutcome;
use super::error::SyncError;
use crate::outcome::Outcome;

/// Aggregated outcomes of a sync run.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub succeeded: Vec<NaiveDate>,
    pub failed: Vec<(NaiveDate, SyncError)>,
}

impl SyncReport {
    /// Drains `outcomes` into a report.
    pub async fn collect<S>(outcomes: S) -> Self
    where
        S: Stream<Item = SyncOutcome>,
    {
        outcomes
            .fold(Self::default(), |mut report, outcome| async move {
                report.record(outcome);
                report
            })
            .await
    }

    pub fn record(&mut self, outcome: SyncOutcome) {
        match outcome {
            Outcome::Success(date) => self.succeeded.push(date),
            Outcome::Failure(date, error) => self.failed.push((date, error)),
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.failed.iter().map(|(date, _)| *date)
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} synced, {} failed",
            self.succeeded.len(),
            self.failed.len()
        )
    }
}
