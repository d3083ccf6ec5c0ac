use chrono::NaiveDate;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use super::error::SyncError;
use super::options::{SyncDirection, SyncMode, SyncOptions};
use crate::outcome::Outcome;
use crate::repository::{LazyRepositoryFactory, RepositoryError, WorkoutLogsRepository};

/// Result of syncing one date.
pub type SyncOutcome = Outcome<NaiveDate, SyncError>;

/// Lazy stream of per-date outcomes. Nothing happens until it is polled,
/// and dropping it stops further dates from starting.
pub type SyncStream = BoxStream<'static, SyncOutcome>;

/// Copies workout logs from a source repository to a destination.
#[derive(Clone)]
pub struct SyncEngine {
    source: Arc<dyn WorkoutLogsRepository>,
    destination: Arc<dyn WorkoutLogsRepository>,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn WorkoutLogsRepository>,
        destination: Arc<dyn WorkoutLogsRepository>,
    ) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Engine between the factory's offline and online repositories.
    pub async fn for_direction(
        factory: &LazyRepositoryFactory,
        direction: SyncDirection,
    ) -> Result<Self, RepositoryError> {
        let offline = factory.offline_repository().await?;
        let online = factory.online_repository().await?;
        Ok(match direction {
            SyncDirection::Upload => Self::new(offline, online),
            SyncDirection::Download => Self::new(online, offline),
        })
    }

    /// Syncs every date the source holds, one at a time.
    pub fn sync(&self, mode: SyncMode, retry_attempts: u32) -> SyncStream {
        self.sync_with(SyncOptions::new(mode).with_retry_attempts(retry_attempts))
    }

    /// Syncs every date the source holds.
    ///
    /// The set of dates is taken from the source's metadata when this is
    /// called. Each date yields exactly one outcome; a failed date never
    /// ends the stream. With `concurrency` above 1 outcomes arrive in
    /// completion order.
    pub fn sync_with(&self, options: SyncOptions) -> SyncStream {
        let dates = self.source.metadata().records();
        tracing::info!(
            "Syncing {} date(s) in {} mode with {} retr{}",
            dates.len(),
            options.mode,
            options.retry_attempts,
            if options.retry_attempts == 1 { "y" } else { "ies" }
        );

        let task = Arc::new(DateSync {
            source: self.source.clone(),
            destination: self.destination.clone(),
            mode: options.mode,
            retry_attempts: options.retry_attempts,
            retry_delay: options.retry_delay,
        });
        let cancellation = options.cancellation;

        stream::iter(dates)
            .take_while(move |date| {
                let cancelled = cancellation.as_ref().is_some_and(|c| c.is_cancelled());
                if cancelled {
                    tracing::info!("Sync cancelled before {}", date);
                }
                future::ready(!cancelled)
            })
            .map(move |date| {
                let task = task.clone();
                async move { task.run(date).await }
            })
            .buffer_unordered(options.concurrency.max(1))
            .boxed()
    }
}

struct DateSync {
    source: Arc<dyn WorkoutLogsRepository>,
    destination: Arc<dyn WorkoutLogsRepository>,
    mode: SyncMode,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl DateSync {
    async fn run(&self, date: NaiveDate) -> SyncOutcome {
        tracing::trace!("Syncing {}", date);

        if self.mode == SyncMode::Preserve && self.destination.metadata().contains_record(date) {
            tracing::debug!("Skipping {}: destination already has a record", date);
            return Outcome::Success(date);
        }

        let log = match self.source.read_workout_log(date).await {
            Ok(Some(log)) => log,
            Ok(None) => {
                tracing::error!("Source lists {} but holds no record for it", date);
                return Outcome::Failure(date, SyncError::MetadataOutOfSync { read_error: None });
            }
            Err(e) => {
                tracing::error!("Source lists {} but reading it failed: {}", date, e);
                return Outcome::Failure(
                    date,
                    SyncError::MetadataOutOfSync {
                        read_error: Some(e),
                    },
                );
            }
        };

        let max_attempts = self.retry_attempts.saturating_add(1);
        let mut attempt = 1;
        loop {
            match self.destination.write_workout_log(date, &log).await {
                Ok(()) => {
                    tracing::debug!("Synced {} on attempt {}", date, attempt);
                    return Outcome::Success(date);
                }
                Err(e) if attempt < max_attempts => {
                    tracing::debug!(
                        "Write for {} failed (attempt {}/{}): {}",
                        date,
                        attempt,
                        max_attempts,
                        e
                    );
                    attempt += 1;
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "Giving up on {} after {} attempt(s): {}",
                        date,
                        attempt,
                        e
                    );
                    return Outcome::Failure(
                        date,
                        SyncError::WriteFailed {
                            attempts: attempt,
                            cause: e,
                        },
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Workout, WorkoutLog};
    use crate::repository::{MemoryWorkoutLogsRepository, RecordIndex};
    use crate::sync::{SyncCancellation, SyncReport};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn log(reps: u32) -> WorkoutLog {
        WorkoutLog::new()
            .with_reps(Workout::PressUp, reps)
            .with_reps(Workout::Squat, reps * 2)
    }

    /// Repository double with scripted failures.
    #[derive(Default)]
    struct ScriptedRepository {
        logs: Mutex<HashMap<NaiveDate, WorkoutLog>>,
        index: RecordIndex,
        // Remaining write failures per date.
        write_failures: Mutex<HashMap<NaiveDate, u32>>,
        read_errors: HashMap<NaiveDate, RepositoryError>,
        write_attempts: AtomicU32,
    }

    impl ScriptedRepository {
        fn with_logs(logs: &[(NaiveDate, WorkoutLog)]) -> Self {
            Self {
                logs: Mutex::new(logs.iter().cloned().collect()),
                index: RecordIndex::from_dates(logs.iter().map(|(date, _)| *date)),
                ..Self::default()
            }
        }

        fn failing_writes(self, date: NaiveDate, failures: u32) -> Self {
            self.write_failures.lock().insert(date, failures);
            self
        }

        /// Lists `date` in the metadata without holding a record for it.
        fn with_ghost(self, date: NaiveDate) -> Self {
            self.index.record(date);
            self
        }

        fn with_read_error(mut self, date: NaiveDate, error: RepositoryError) -> Self {
            self.index.record(date);
            self.read_errors.insert(date, error);
            self
        }

        fn stored(&self, date: NaiveDate) -> Option<WorkoutLog> {
            self.logs.lock().get(&date).cloned()
        }

        fn attempts(&self) -> u32 {
            self.write_attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WorkoutLogsRepository for ScriptedRepository {
        async fn read_workout_log(
            &self,
            date: NaiveDate,
        ) -> Result<Option<WorkoutLog>, RepositoryError> {
            if let Some(e) = self.read_errors.get(&date) {
                return Err(e.clone());
            }
            Ok(self.stored(date))
        }

        async fn write_workout_log(
            &self,
            date: NaiveDate,
            log: &WorkoutLog,
        ) -> Result<(), RepositoryError> {
            let attempt = self.write_attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(remaining) = self.write_failures.lock().get_mut(&date) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(RepositoryError::Storage(format!(
                        "write failure {}",
                        attempt
                    )));
                }
            }
            self.logs.lock().insert(date, log.clone());
            self.index.record(date);
            Ok(())
        }

        async fn update_workout_log(
            &self,
            date: NaiveDate,
            workout: Workout,
            reps: u32,
        ) -> Result<(), RepositoryError> {
            let mut logs = self.logs.lock();
            let log = logs.get_mut(&date).ok_or(RepositoryError::NotFound(date))?;
            *log = log.with_reps(workout, reps);
            Ok(())
        }

        fn metadata(&self) -> &RecordIndex {
            &self.index
        }
    }

    fn engine(
        source: &Arc<ScriptedRepository>,
        destination: &Arc<ScriptedRepository>,
    ) -> SyncEngine {
        SyncEngine::new(source.clone(), destination.clone())
    }

    async fn run(engine: &SyncEngine, options: SyncOptions) -> Vec<SyncOutcome> {
        engine.sync_with(options).collect().await
    }

    #[tokio::test]
    async fn test_overwrite_copies_every_date() {
        let source = Arc::new(ScriptedRepository::with_logs(&[
            (date(1), log(10)),
            (date(2), log(20)),
        ]));
        let destination = Arc::new(ScriptedRepository::default());

        let outcomes: Vec<_> = engine(&source, &destination)
            .sync(SyncMode::Overwrite, 0)
            .collect()
            .await;

        assert_eq!(
            outcomes,
            vec![Outcome::Success(date(1)), Outcome::Success(date(2))]
        );
        assert_eq!(destination.stored(date(1)), Some(log(10)));
        assert_eq!(destination.stored(date(2)), Some(log(20)));
        assert!(destination.metadata().contains_record(date(1)));
        assert!(destination.metadata().contains_record(date(2)));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_existing_records() {
        let source = Arc::new(ScriptedRepository::with_logs(&[(date(1), log(10))]));
        let destination = Arc::new(ScriptedRepository::with_logs(&[(date(1), log(99))]));

        let outcomes = run(
            &engine(&source, &destination),
            SyncOptions::new(SyncMode::Overwrite),
        )
        .await;

        assert_eq!(outcomes, vec![Outcome::Success(date(1))]);
        assert_eq!(destination.stored(date(1)), Some(log(10)));
    }

    #[tokio::test]
    async fn test_preserve_keeps_existing_records() {
        let source = Arc::new(ScriptedRepository::with_logs(&[
            (date(1), log(10)),
            (date(2), log(20)),
        ]));
        let destination = Arc::new(ScriptedRepository::with_logs(&[(date(1), log(99))]));

        let outcomes = run(
            &engine(&source, &destination),
            SyncOptions::new(SyncMode::Preserve),
        )
        .await;

        assert_eq!(
            outcomes,
            vec![Outcome::Success(date(1)), Outcome::Success(date(2))]
        );
        assert_eq!(destination.stored(date(1)), Some(log(99)));
        assert_eq!(destination.stored(date(2)), Some(log(20)));
        assert_eq!(destination.attempts(), 1);
    }

    #[tokio::test]
    async fn test_preserve_is_idempotent() {
        let source = Arc::new(ScriptedRepository::with_logs(&[
            (date(1), log(1)),
            (date(2), log(2)),
            (date(3), log(3)),
        ]));
        let destination = Arc::new(ScriptedRepository::default());
        let engine = engine(&source, &destination);

        let first: Vec<_> = engine.sync(SyncMode::Preserve, 0).collect().await;
        assert!(first.iter().all(Outcome::is_success));
        assert_eq!(destination.attempts(), 3);

        let second: Vec<_> = engine.sync(SyncMode::Preserve, 0).collect().await;
        assert_eq!(second.len(), 3);
        assert!(second.iter().all(Outcome::is_success));
        assert_eq!(destination.attempts(), 3);
    }

    #[tokio::test]
    async fn test_empty_source_yields_nothing() {
        let source = Arc::new(ScriptedRepository::default());
        let destination = Arc::new(ScriptedRepository::default());

        let outcomes = run(&engine(&source, &destination), SyncOptions::default()).await;

        assert!(outcomes.is_empty());
        assert_eq!(destination.attempts(), 0);
    }

    #[tokio::test]
    async fn test_write_succeeds_on_final_attempt() {
        let retry_attempts = 3;
        let source = Arc::new(ScriptedRepository::with_logs(&[(date(1), log(5))]));
        let destination =
            Arc::new(ScriptedRepository::default().failing_writes(date(1), retry_attempts));

        let outcomes = run(
            &engine(&source, &destination),
            SyncOptions::new(SyncMode::Overwrite).with_retry_attempts(retry_attempts),
        )
        .await;

        assert_eq!(outcomes, vec![Outcome::Success(date(1))]);
        assert_eq!(destination.attempts(), retry_attempts + 1);
        assert_eq!(destination.stored(date(1)), Some(log(5)));
    }

    #[tokio::test]
    async fn test_write_fails_after_exhausting_retries() {
        let retry_attempts = 3;
        let source = Arc::new(ScriptedRepository::with_logs(&[(date(1), log(5))]));
        let destination =
            Arc::new(ScriptedRepository::default().failing_writes(date(1), retry_attempts + 1));

        let outcomes = run(
            &engine(&source, &destination),
            SyncOptions::new(SyncMode::Overwrite).with_retry_attempts(retry_attempts),
        )
        .await;

        assert_eq!(
            outcomes,
            vec![Outcome::Failure(
                date(1),
                SyncError::WriteFailed {
                    attempts: 4,
                    cause: RepositoryError::Storage("write failure 4".into()),
                }
            )]
        );
        assert_eq!(destination.attempts(), retry_attempts + 1);
        assert_eq!(destination.stored(date(1)), None);
        assert!(!destination.metadata().contains_record(date(1)));
    }

    #[tokio::test]
    async fn test_zero_retries_means_one_attempt() {
        let source = Arc::new(ScriptedRepository::with_logs(&[(date(1), log(5))]));
        let destination = Arc::new(ScriptedRepository::default().failing_writes(date(1), 1));

        let outcomes: Vec<_> = engine(&source, &destination)
            .sync(SyncMode::Overwrite, 0)
            .collect()
            .await;

        assert!(matches!(
            &outcomes[..],
            [Outcome::Failure(_, SyncError::WriteFailed { attempts: 1, .. })]
        ));
        assert_eq!(destination.attempts(), 1);
    }

    #[tokio::test]
    async fn test_retry_delay_is_applied() {
        let source = Arc::new(ScriptedRepository::with_logs(&[(date(1), log(5))]));
        let destination = Arc::new(ScriptedRepository::default().failing_writes(date(1), 2));
        let delay = Duration::from_millis(10);

        let started = std::time::Instant::now();
        let outcomes = run(
            &engine(&source, &destination),
            SyncOptions::new(SyncMode::Overwrite)
                .with_retry_attempts(2)
                .with_retry_delay(delay),
        )
        .await;

        assert_eq!(outcomes, vec![Outcome::Success(date(1))]);
        assert!(started.elapsed() >= delay * 2);
    }

    #[tokio::test]
    async fn test_missing_source_record_is_not_retried() {
        let source = Arc::new(ScriptedRepository::default().with_ghost(date(1)));
        let destination = Arc::new(ScriptedRepository::default());

        let outcomes = run(
            &engine(&source, &destination),
            SyncOptions::new(SyncMode::Overwrite).with_retry_attempts(5),
        )
        .await;

        assert_eq!(
            outcomes,
            vec![Outcome::Failure(
                date(1),
                SyncError::MetadataOutOfSync { read_error: None }
            )]
        );
        assert_eq!(destination.attempts(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_source_record_is_reported() {
        let read_error = RepositoryError::Corrupt {
            date: date(2),
            reason: "bad bytes".into(),
        };
        let source = Arc::new(
            ScriptedRepository::with_logs(&[(date(1), log(1))])
                .with_read_error(date(2), read_error.clone()),
        );
        let destination = Arc::new(ScriptedRepository::default());

        let outcomes = run(
            &engine(&source, &destination),
            SyncOptions::new(SyncMode::Overwrite),
        )
        .await;

        assert_eq!(
            outcomes,
            vec![
                Outcome::Success(date(1)),
                Outcome::Failure(
                    date(2),
                    SyncError::MetadataOutOfSync {
                        read_error: Some(read_error)
                    }
                ),
            ]
        );
        assert_eq!(destination.attempts(), 1);
    }

    #[tokio::test]
    async fn test_failed_date_does_not_stop_the_stream() {
        let source = Arc::new(ScriptedRepository::with_logs(&[
            (date(1), log(1)),
            (date(2), log(2)),
            (date(3), log(3)),
        ]));
        let destination =
            Arc::new(ScriptedRepository::default().failing_writes(date(2), u32::MAX));

        let report = SyncReport::collect(
            engine(&source, &destination).sync(SyncMode::Overwrite, 1),
        )
        .await;

        assert_eq!(report.succeeded, vec![date(1), date(3)]);
        assert_eq!(report.failed_dates().collect::<Vec<_>>(), vec![date(2)]);
        assert_eq!(destination.stored(date(3)), Some(log(3)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sync_reports_each_date_once() {
        let logs: Vec<_> = (1..=28).map(|day| (date(day), log(day))).collect();
        let source = Arc::new(ScriptedRepository::with_logs(&logs));
        let destination = Arc::new(
            ScriptedRepository::default()
                .failing_writes(date(5), 1)
                .failing_writes(date(17), 2),
        );

        let outcomes = run(
            &engine(&source, &destination),
            SyncOptions::new(SyncMode::Overwrite)
                .with_retry_attempts(2)
                .with_concurrency(4),
        )
        .await;

        assert_eq!(outcomes.len(), logs.len());
        let dates: HashSet<_> = outcomes.iter().map(|o| *o.subject()).collect();
        assert_eq!(dates.len(), logs.len());
        assert!(outcomes.iter().all(Outcome::is_success));
        for (date, log) in &logs {
            assert_eq!(destination.stored(*date).as_ref(), Some(log));
        }
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_next_date() {
        let source = Arc::new(ScriptedRepository::with_logs(&[
            (date(1), log(1)),
            (date(2), log(2)),
            (date(3), log(3)),
        ]));
        let destination = Arc::new(ScriptedRepository::default());
        let cancellation = SyncCancellation::new();

        let mut stream = engine(&source, &destination).sync_with(
            SyncOptions::new(SyncMode::Overwrite).with_cancellation(cancellation.clone()),
        );

        assert_eq!(stream.next().await, Some(Outcome::Success(date(1))));
        cancellation.cancel();
        assert_eq!(stream.next().await, None);

        assert_eq!(destination.attempts(), 1);
        assert_eq!(destination.stored(date(2)), None);
    }

    #[tokio::test]
    async fn test_dropping_stream_stops_sync() {
        let source = Arc::new(ScriptedRepository::with_logs(&[
            (date(1), log(1)),
            (date(2), log(2)),
        ]));
        let destination = Arc::new(ScriptedRepository::default());

        let first: Vec<_> = engine(&source, &destination)
            .sync(SyncMode::Overwrite, 0)
            .take(1)
            .collect()
            .await;

        assert_eq!(first, vec![Outcome::Success(date(1))]);
        assert_eq!(destination.attempts(), 1);
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let source = Arc::new(ScriptedRepository::with_logs(&[(date(1), log(1))]));
        let destination = Arc::new(ScriptedRepository::default());

        let stream = engine(&source, &destination).sync(SyncMode::Overwrite, 0);
        assert_eq!(destination.attempts(), 0);
        drop(stream);
        assert_eq!(destination.attempts(), 0);
    }

    #[tokio::test]
    async fn test_for_direction_picks_source_and_destination() {
        let offline = Arc::new(MemoryWorkoutLogsRepository::with_logs([(date(1), log(1))]));
        let online = Arc::new(MemoryWorkoutLogsRepository::with_logs([(date(2), log(2))]));
        let factory = LazyRepositoryFactory::from_instances(offline.clone(), online.clone());

        let upload = SyncEngine::for_direction(&factory, SyncDirection::Upload)
            .await
            .unwrap();
        let outcomes: Vec<_> = upload.sync(SyncMode::Preserve, 0).collect().await;
        assert_eq!(outcomes, vec![Outcome::Success(date(1))]);
        assert_eq!(online.len(), 2);
        assert_eq!(offline.len(), 1);

        let download = SyncEngine::for_direction(&factory, SyncDirection::Download)
            .await
            .unwrap();
        let outcomes: Vec<_> = download.sync(SyncMode::Preserve, 0).collect().await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(offline.len(), 2);
    }
}
