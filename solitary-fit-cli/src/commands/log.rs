use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde::Serialize;
use solitary_fit_core::models::{Workout, WorkoutLog};
use solitary_fit_core::repository::{RepositoryError, WorkoutLogsRepository};

use super::{parse_date, runtime, OutputFormat};
use crate::config::Config;
use crate::session::Session;
use crate::store::repository_factory;

#[derive(Args)]
pub struct LogCommand {
    #[command(subcommand)]
    pub command: LogSubcommand,
}

#[derive(Subcommand)]
pub enum LogSubcommand {
    /// Show the workout log for a day
    Show {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long, short)]
        date: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add repetitions of a workout
    Add {
        /// Workout (burpee, handstand_press_up, press_up, sit_up, squat, squat_thrust, star_jump, step_up)
        workout: Workout,

        /// Repetitions to add
        reps: u32,

        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long, short)]
        date: Option<String>,
    },

    /// Reset every workout for a day to zero
    Reset {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long, short)]
        date: Option<String>,
    },

    /// List logged days with their totals
    History {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Serialize)]
struct DayTotal {
    date: NaiveDate,
    total: u64,
}

impl LogCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let session = Session::load(&config.session_path())?;
        let factory = repository_factory(config, session.current_user().cloned());

        runtime()?.block_on(async {
            let repo = factory.create(session.state().is_signed_in()).await?;
            self.execute(repo.as_ref()).await
        })
    }

    async fn execute(
        &self,
        repo: &dyn WorkoutLogsRepository,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            LogSubcommand::Show { date, format } => {
                let date = parse_date(date.as_deref())?;
                let log = repo.read_workout_log(date).await?.unwrap_or_default();

                match format {
                    OutputFormat::Json => {
                        let output = serde_json::json!({ "date": date, "reps": log });
                        println!("{}", serde_json::to_string_pretty(&output)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", date);
                        println!("{}", "-".repeat(27));
                        println!("{}", log);
                    }
                }
            }

            LogSubcommand::Add {
                workout,
                reps,
                date,
            } => {
                let date = parse_date(date.as_deref())?;
                let log = add_reps(repo, date, *workout, *reps).await?;
                println!(
                    "Logged {} {} on {} ({} today)",
                    reps,
                    workout.display_name(),
                    date,
                    log[*workout]
                );
            }

            LogSubcommand::Reset { date } => {
                let date = parse_date(date.as_deref())?;
                repo.write_workout_log(date, &WorkoutLog::new()).await?;
                println!("Reset workout log for {}", date);
            }

            LogSubcommand::History { format } => {
                let days = day_totals(repo).await?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&days)?);
                    }
                    OutputFormat::Text => {
                        if days.is_empty() {
                            println!("No workouts logged yet.");
                            return Ok(());
                        }
                        for day in &days {
                            println!("  {}  {:>6}", day.date, day.total);
                        }
                        println!("\nTotal: {} day(s)", days.len());
                    }
                }
            }
        }

        Ok(())
    }
}

/// Totals for every recorded day. Days that are missing or unreadable are
/// skipped with a warning.
async fn day_totals(repo: &dyn WorkoutLogsRepository) -> Result<Vec<DayTotal>, RepositoryError> {
    let mut days = Vec::new();
    for date in repo.metadata().records() {
        let total = match repo.read_workout_log(date).await {
            Ok(Some(log)) => log.total(),
            Ok(None) => {
                tracing::warn!("Index lists {} but no log was found", date);
                continue;
            }
            Err(e @ RepositoryError::Corrupt { .. }) => {
                tracing::warn!("Skipping {}: {}", date, e);
                continue;
            }
            Err(e) => return Err(e),
        };
        days.push(DayTotal { date, total });
    }
    Ok(days)
}

/// Adds `reps` to `workout` for `date` and returns the stored log.
///
/// Updates the existing record when there is one; a record that vanished
/// between the read and the update is written in full instead.
async fn add_reps(
    repo: &dyn WorkoutLogsRepository,
    date: NaiveDate,
    workout: Workout,
    reps: u32,
) -> Result<WorkoutLog, RepositoryError> {
    let Some(existing) = repo.read_workout_log(date).await? else {
        let log = WorkoutLog::new().with_reps(workout, reps);
        repo.write_workout_log(date, &log).await?;
        return Ok(log);
    };

    let log = existing.incremented(workout, reps);
    match repo.update_workout_log(date, workout, log[workout]).await {
        Ok(()) => Ok(log),
        Err(RepositoryError::NotFound(_)) => {
            tracing::debug!("Record for {} disappeared, writing it in full", date);
            repo.write_workout_log(date, &log).await?;
            Ok(log)
        }
        Err(e) => Err(e),
    }
}
