//! Wires the offline and online repositories to the configuration.

use solitary_fit_core::automerge::DocumentWorkoutLogsRepository;
use solitary_fit_core::identity::User;
use solitary_fit_core::repository::{
    LazyRepositoryFactory, RepositoryError, WorkoutLogsRepository,
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::db::{init_db, SqliteWorkoutLogsRepository};

/// Builds the repository factory for `user` (`None` when signed out).
///
/// The offline repository is the SQLite database; the online one is the
/// user's document store under `remote_dir`. Neither is opened until used.
pub fn repository_factory(config: &Config, user: Option<User>) -> LazyRepositoryFactory {
    let database_path = config.database_path.value.clone();
    let remote_dir = config.remote_dir.value.clone();

    LazyRepositoryFactory::new(
        move || open_offline(database_path.clone()),
        move || open_online(remote_dir.clone(), user.clone()),
    )
}

async fn open_offline(
    database_path: PathBuf,
) -> Result<Arc<dyn WorkoutLogsRepository>, RepositoryError> {
    let pool = init_db(&database_path)
        .await
        .map_err(RepositoryError::storage)?;
    let repo = SqliteWorkoutLogsRepository::open(pool)
        .await
        .map_err(RepositoryError::storage)?;
    Ok(Arc::new(repo))
}

async fn open_online(
    remote_dir: PathBuf,
    user: Option<User>,
) -> Result<Arc<dyn WorkoutLogsRepository>, RepositoryError> {
    let user = user.ok_or(RepositoryError::NotSignedIn)?;
    let repo = DocumentWorkoutLogsRepository::open(&remote_dir, &user).await?;
    Ok(Arc::new(repo))
}
