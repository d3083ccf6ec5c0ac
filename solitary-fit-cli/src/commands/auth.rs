//! Sign-in commands for the fit CLI.

use clap::{Args, Subcommand};
use futures::StreamExt;
use solitary_fit_core::identity::User;
use solitary_fit_core::outcome::Outcome;
use solitary_fit_core::repository::LazyRepositoryFactory;
use solitary_fit_core::sync::{SyncEngine, SyncMode, SyncOptions};

use super::{runtime, OutputFormat};
use crate::config::Config;
use crate::session::Session;
use crate::store::repository_factory;

/// Authentication commands
#[derive(Args)]
pub struct AuthCommand {
    #[command(subcommand)]
    command: AuthSubcommand,
}

#[derive(Subcommand)]
enum AuthSubcommand {
    /// Sign in, switching to the online store
    Login {
        /// User id
        #[arg(long)]
        id: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Don't copy offline logs to the account on first sign-in
        #[arg(long)]
        no_sync: bool,
    },
    /// Sign out, switching back to the offline store
    Logout,
    /// Show who is signed in
    Status {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl AuthCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let session_path = config.session_path();
        let mut session = Session::load(&session_path)?;

        match &self.command {
            AuthSubcommand::Login {
                id,
                name,
                email,
                no_sync,
            } => {
                let mut user = User::new(id.as_str());
                user.name = name.clone();
                user.email = email.clone();

                let first_sign_in = !session.has_previously_signed_in(&user.id);
                session.sign_in(user.clone())?;
                if first_sign_in && !no_sync {
                    let factory = repository_factory(config, Some(user.clone()));
                    let options = config.sync.options(SyncMode::Overwrite);
                    runtime()?.block_on(upload_offline_logs(&factory, options))?;
                }

                session.save(&session_path)?;
                println!("Signed in as {}", user);
            }

            AuthSubcommand::Logout => {
                let user = session.sign_out()?;
                session.save(&session_path)?;
                println!("Signed out {}", user.display_name());
            }

            AuthSubcommand::Status { format } => match format {
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "signed_in": session.is_signed_in(),
                        "user": session.current_user(),
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => match session.current_user() {
                    Some(user) => {
                        println!("Signed in as {}", user);
                        println!("User id: {}", user.id);
                        println!("Using online store: {}", config.remote_dir.value.display());
                    }
                    None => {
                        println!("Not signed in");
                        println!(
                            "Using offline database: {}",
                            config.database_path.value.display()
                        );
                    }
                },
            },
        }

        Ok(())
    }
}

/// Copies every offline log into the newly signed-in account.
///
/// Per-date failures are printed and do not stop the sign-in.
async fn upload_offline_logs(
    factory: &LazyRepositoryFactory,
    options: SyncOptions,
) -> Result<usize, Box<dyn std::error::Error>> {
    let offline = factory.offline_repository().await?;
    if offline.metadata().is_empty() {
        return Ok(0);
    }

    println!(
        "Copying {} offline log(s) to your account...",
        offline.metadata().len()
    );

    let engine = SyncEngine::new(offline, factory.online_repository().await?);
    let mut outcomes = engine.sync_with(options);
    let mut failures = 0;
    while let Some(outcome) = outcomes.next().await {
        if let Outcome::Failure(date, e) = outcome {
            tracing::warn!("Sync failed for {}: {}", date, e);
            println!("Sync failed for {}", date);
            failures += 1;
        }
    }
    Ok(failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use solitary_fit_core::models::{Workout, WorkoutLog};
    use solitary_fit_core::repository::{MemoryWorkoutLogsRepository, WorkoutLogsRepository};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_upload_copies_offline_logs() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let log = WorkoutLog::new().with_reps(Workout::StarJump, 50);
        let offline = Arc::new(MemoryWorkoutLogsRepository::with_logs([(date, log.clone())]));
        let online = Arc::new(MemoryWorkoutLogsRepository::new());
        let factory = LazyRepositoryFactory::from_instances(offline, online.clone());

        let failures = upload_offline_logs(&factory, SyncOptions::new(SyncMode::Overwrite))
            .await
            .unwrap();

        assert_eq!(failures, 0);
        assert_eq!(online.read_workout_log(date).await.unwrap(), Some(log));
    }

    #[tokio::test]
    async fn test_upload_skips_empty_offline_store() {
        let factory = LazyRepositoryFactory::new(
            || async {
                Ok::<Arc<dyn WorkoutLogsRepository>, _>(Arc::new(
                    MemoryWorkoutLogsRepository::new(),
                ))
            },
            || async {
                Err::<Arc<dyn WorkoutLogsRepository>, _>(
                    solitary_fit_core::repository::RepositoryError::NotSignedIn,
                )
            },
        );

        // the online store is never opened
        let failures = upload_offline_logs(&factory, SyncOptions::default())
            .await
            .unwrap();
        assert_eq!(failures, 0);
    }
}
