use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod db;
mod session;
mod store;

use commands::{AuthCommand, ConfigCommand, LogCommand, SyncCommand};
use config::Config;

#[derive(Parser)]
#[command(name = "fit")]
#[command(version)]
#[command(about = "A workout logging CLI application", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log and review workouts
    Log(LogCommand),

    /// Sign in and out
    Auth(AuthCommand),

    /// Copy logs between the offline and online stores
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

fn main() {
    init_tracing();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Logs to stderr, filtered by `RUST_LOG` (default: warnings only).
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Save config path for config init
    let cli_config_path = cli.config.clone();

    let config = Config::load(cli.config)?;
    tracing::debug!(
        "Loaded configuration (file: {:?})",
        config.config_file.as_deref()
    );

    match &cli.command {
        Some(Commands::Log(cmd)) => cmd.run(&config),
        Some(Commands::Auth(cmd)) => cmd.run(&config),
        Some(Commands::Sync(cmd)) => cmd.run(&config),
        Some(Commands::Config(cmd)) => cmd.run(&config, cli_config_path),
        None => {
            println!("Use --help to see available commands");
            Ok(())
        }
    }
}
