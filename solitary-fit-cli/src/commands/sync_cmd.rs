//! Sync command for copying logs between the offline and online stores.

use clap::{Args, ValueEnum};
use futures::StreamExt;
use solitary_fit_core::outcome::Outcome;
use solitary_fit_core::sync::{
    SyncCancellation, SyncDirection, SyncEngine, SyncMode, SyncOptions, SyncReport,
};

use super::runtime;
use crate::config::Config;
use crate::session::Session;
use crate::store::repository_factory;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Direction {
    /// Offline database to online store
    Up,
    /// Online store to offline database
    Down,
}

impl From<Direction> for SyncDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => SyncDirection::Upload,
            Direction::Down => SyncDirection::Download,
        }
    }
}

/// Copy workout logs between the offline and online stores
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Which way to copy
    #[arg(long, value_enum, default_value = "up")]
    direction: Direction,

    /// preserve: skip dates the destination already has; overwrite: replace them
    #[arg(long, default_value = "preserve")]
    mode: SyncMode,

    /// Write retries per date (overrides config)
    #[arg(long)]
    retries: Option<u32>,

    /// Dates synced at once (overrides config)
    #[arg(long)]
    concurrency: Option<usize>,
}

impl SyncCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let session = Session::load(&config.session_path())?;
        let user = session
            .current_user()
            .cloned()
            .ok_or("Not signed in. Run 'fit auth login' first.")?;

        let mut options = config.sync.options(self.mode);
        if let Some(retries) = self.retries {
            options.retry_attempts = retries;
        }
        if let Some(concurrency) = self.concurrency {
            options.concurrency = concurrency;
        }

        let factory = repository_factory(config, Some(user));
        let direction = SyncDirection::from(self.direction);

        let report = runtime()?.block_on(async {
            let engine = SyncEngine::for_direction(&factory, direction).await?;
            Ok::<_, Box<dyn std::error::Error>>(self.sync(&engine, direction, options).await)
        })?;

        println!();
        if report.is_success() {
            println!("Sync complete: {}.", report);
            Ok(())
        } else {
            Err(format!("{} date(s) failed to sync", report.failed.len()).into())
        }
    }

    async fn sync(
        &self,
        engine: &SyncEngine,
        direction: SyncDirection,
        options: SyncOptions,
    ) -> SyncReport {
        let cancellation = SyncCancellation::new();
        let on_interrupt = cancellation.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupted, finishing dates in progress...");
                on_interrupt.cancel();
            }
        });

        println!("Syncing ({}, {})...", direction, options.mode);
        println!();

        let mut outcomes = engine.sync_with(options.with_cancellation(cancellation));
        let mut report = SyncReport::default();
        while let Some(outcome) = outcomes.next().await {
            match &outcome {
                Outcome::Success(date) => println!("  ✓ {}", date),
                Outcome::Failure(date, e) => println!("  ✗ {} - {}", date, e),
            }
            report.record(outcome);
        }

        interrupt.abort();
        report
    }
}
