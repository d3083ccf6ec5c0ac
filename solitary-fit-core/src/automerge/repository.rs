//! Per-user document store repository.
//!
//! Each date is its own Automerge document, so the directory can be
//! replicated document by document. File I/O runs on the blocking pool.

use async_trait::async_trait;
use automerge::AutoCommit;
use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::reader::read_workout_log;
use super::storage::{StorageError, UserDocumentStorage};
use super::writer::{write_reps, write_workout_log};
use crate::identity::User;
use crate::models::{Workout, WorkoutLog};
use crate::repository::{RecordIndex, RepositoryError, WorkoutLogsRepository};

/// Workout logs stored as one Automerge document per user per date.
#[derive(Debug)]
pub struct DocumentWorkoutLogsRepository {
    storage: UserDocumentStorage,
    index: Arc<RecordIndex>,
    // Serialises load-modify-save cycles. The guard moves into the blocking
    // task, so it is held until the save ends even if the caller goes away.
    write_lock: Arc<Mutex<()>>,
}

impl DocumentWorkoutLogsRepository {
    /// Opens `user`'s workout logs under `root`, indexing existing documents.
    pub async fn open(root: &Path, user: &User) -> Result<Self, RepositoryError> {
        validate_user_id(&user.id)?;

        let storage = UserDocumentStorage::new(root, &user.id);
        let listing = storage.clone();
        let dates = run_blocking(move || listing.list_dates().map_err(RepositoryError::storage))
            .await?;

        tracing::debug!(
            "Opened document store for user {} with {} record(s)",
            user.id,
            dates.len()
        );

        Ok(Self {
            storage,
            index: Arc::new(RecordIndex::from_dates(dates)),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn storage(&self) -> &UserDocumentStorage {
        &self.storage
    }
}

#[async_trait]
impl WorkoutLogsRepository for DocumentWorkoutLogsRepository {
    async fn read_workout_log(
        &self,
        date: NaiveDate,
    ) -> Result<Option<WorkoutLog>, RepositoryError> {
        let storage = self.storage.clone();
        run_blocking(move || match storage.load(date) {
            Ok(Some(doc)) => read_workout_log(&doc)
                .map(Some)
                .map_err(|e| RepositoryError::Corrupt {
                    date,
                    reason: e.to_string(),
                }),
            Ok(None) => Ok(None),
            Err(e) => Err(load_error(date, e)),
        })
        .await
    }

    async fn write_workout_log(
        &self,
        date: NaiveDate,
        log: &WorkoutLog,
    ) -> Result<(), RepositoryError> {
        let guard = self.write_lock.clone().lock_owned().await;

        let storage = self.storage.clone();
        let index = self.index.clone();
        let log = log.clone();
        run_blocking(move || {
            let _guard = guard;
            // Keep the document's history when there is one; the write
            // still replaces every field.
            let mut doc = match storage.load(date) {
                Ok(Some(doc)) => doc,
                Ok(None) => AutoCommit::new(),
                Err(StorageError::LoadError(path, e)) => {
                    tracing::warn!("Replacing unreadable document {}: {}", path.display(), e);
                    AutoCommit::new()
                }
                Err(e) => return Err(RepositoryError::storage(e)),
            };
            write_workout_log(&mut doc, &log).map_err(RepositoryError::storage)?;
            storage.save(date, &mut doc).map_err(RepositoryError::storage)?;

            index.record(date);
            tracing::trace!("Wrote workout log document for {}", date);
            Ok(())
        })
        .await
    }

    async fn update_workout_log(
        &self,
        date: NaiveDate,
        workout: Workout,
        reps: u32,
    ) -> Result<(), RepositoryError> {
        let guard = self.write_lock.clone().lock_owned().await;

        let storage = self.storage.clone();
        run_blocking(move || {
            let _guard = guard;
            let mut doc = storage
                .load(date)
                .map_err(|e| load_error(date, e))?
                .ok_or(RepositoryError::NotFound(date))?;
            write_reps(&mut doc, workout, reps).map_err(RepositoryError::storage)?;
            storage.save(date, &mut doc).map_err(RepositoryError::storage)
        })
        .await
    }

    fn metadata(&self) -> &RecordIndex {
        &self.index
    }
}

fn load_error(date: NaiveDate, e: StorageError) -> RepositoryError {
    match e {
        StorageError::LoadError(_, reason) => RepositoryError::Corrupt { date, reason },
        e => RepositoryError::storage(e),
    }
}

/// User ids become directory names.
fn validate_user_id(id: &str) -> Result<(), RepositoryError> {
    let invalid = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\'])
        || id.chars().any(char::is_control);
    if invalid {
        return Err(RepositoryError::Storage(format!("invalid user id '{}'", id)));
    }
    Ok(())
}

async fn run_blocking<T, F>(f: F) -> Result<T, RepositoryError>
where
    F: FnOnce() -> Result<T, RepositoryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(RepositoryError::storage)?
}
