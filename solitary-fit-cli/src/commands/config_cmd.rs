use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# fit configuration

# Directory for the session file (default: platform data dir + /fit)
# data_dir: ~/.local/share/fit

# Offline SQLite database (default: <data_dir>/fit.db)
# database_path: ~/.local/share/fit/fit.db

# Online document store root (default: <data_dir>/remote)
# remote_dir: ~/.local/share/fit/remote

sync:
  # Write retries per date after the first attempt
  retry_attempts: 2
  # Pause between attempts
  retry_delay_ms: 0
  # Dates synced at once
  concurrency: 1
"#;

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        cli_config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                cli_config_path
                                    .unwrap_or_else(Config::default_config_path)
                                    .display()
                            );
                        }
                        println!();

                        for (key, value) in [
                            ("data_dir", &config.data_dir),
                            ("database_path", &config.database_path),
                            ("remote_dir", &config.remote_dir),
                        ] {
                            println!("{}: {}", key, value.value.display());
                            println!("  source: {}", value.source);
                            println!();
                        }

                        println!("sync:");
                        println!("  retry_attempts: {}", config.sync.retry_attempts);
                        println!("  retry_delay_ms: {}", config.sync.retry_delay_ms);
                        println!("  concurrency: {}", config.sync.concurrency);
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = cli_config_path.unwrap_or_else(Config::default_config_path);

                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'fit config show' to view current configuration.");
                    return Ok(());
                }

                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut file = fs::File::create(&config_path)?;
                file.write_all(DEFAULT_CONFIG.as_bytes())?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}
