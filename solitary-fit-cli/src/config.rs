use serde::{Deserialize, Serialize};
use solitary_fit_core::sync::{SyncMode, SyncOptions, DEFAULT_RETRY_ATTEMPTS};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Sync engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Write retries per date after the first attempt
    pub retry_attempts: u32,
    /// Pause between write attempts, in milliseconds
    pub retry_delay_ms: u64,
    /// Dates synced at once
    pub concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_ms: 0,
            concurrency: 1,
        }
    }
}

impl SyncConfig {
    pub fn options(&self, mode: SyncMode) -> SyncOptions {
        SyncOptions::new(mode)
            .with_retry_attempts(self.retry_attempts)
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms))
            .with_concurrency(self.concurrency)
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the offline SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Root of the online document store
    pub remote_dir: ConfigValue<PathBuf>,
    /// Directory for the session file
    pub data_dir: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub sync: SyncConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    remote_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    sync: Option<SyncConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    pub(crate) fn load_with_env<F>(
        config_path: Option<PathBuf>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut file_config = ConfigFile::default();
        let mut config_file = None;

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            file_config = serde_yaml::from_str::<Option<ConfigFile>>(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?
                .unwrap_or_default();
            config_file = Some(path);
        }

        let resolve = |value: PathBuf| match config_file.as_deref().and_then(Path::parent) {
            Some(dir) if value.is_relative() => dir.join(value),
            _ => value,
        };

        let mut data_dir = match file_config.data_dir {
            Some(dir) => ConfigValue::new(resolve(dir), ConfigSource::File),
            None => ConfigValue::new(Self::default_data_dir(), ConfigSource::Default),
        };
        if let Some(dir) = env("FIT_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }

        // The other paths default to locations inside the data directory
        let mut database_path = match file_config.database_path {
            Some(db_path) => ConfigValue::new(resolve(db_path), ConfigSource::File),
            None => ConfigValue::new(data_dir.value.join("fit.db"), ConfigSource::Default),
        };
        if let Some(db_path) = env("FIT_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }

        let mut remote_dir = match file_config.remote_dir {
            Some(dir) => ConfigValue::new(resolve(dir), ConfigSource::File),
            None => ConfigValue::new(data_dir.value.join("remote"), ConfigSource::Default),
        };
        if let Some(dir) = env("FIT_REMOTE_DIR") {
            remote_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }

        let mut sync = file_config.sync.unwrap_or_default();
        if let Some(retries) = env("FIT_SYNC_RETRIES") {
            sync.retry_attempts = retries
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("FIT_SYNC_RETRIES", retries.clone()))?;
        }

        Ok(Self {
            database_path,
            remote_dir,
            data_dir,
            config_file,
            sync,
        })
    }

    /// Path of the session file inside the data directory
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.value.join("session.yaml")
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/fit/
    /// - macOS: ~/Library/Application Support/fit/
    /// - Windows: %APPDATA%/fit/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fit")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/fit/
    /// - macOS: ~/Library/Application Support/fit/
    /// - Windows: %APPDATA%/fit/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fit")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {1}", .0.display())]
    ReadError(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{}': {1}", .0.display())]
    ParseError(PathBuf, #[source] serde_yaml::Error),

    #[error("Invalid value for {0}: '{1}'")]
    InvalidEnv(&'static str, String),
}
