//! Automerge document storage for per-user workout logs.
//!
//! Storage layout:
//! ```text
//! <remote_dir>/
//! └── users/
//!     └── <user-id>/
//!         └── workout-logs/
//!             ├── 2024-03-01.automerge
//!             └── 2024-03-02.automerge
//! ```

use automerge::AutoCommit;
use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extension for Automerge documents.
const DOC_EXTENSION: &str = "automerge";

/// Date format used in document file names.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage for one user's workout log documents.
#[derive(Clone, Debug)]
pub struct UserDocumentStorage {
    logs_dir: PathBuf,
}

impl UserDocumentStorage {
    /// Creates storage for `user_id` under the store's root directory.
    pub fn new(root: &Path, user_id: &str) -> Self {
        Self {
            logs_dir: root.join("users").join(user_id).join("workout-logs"),
        }
    }

    /// Returns the directory holding this user's documents.
    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// Returns the full path for a date's document.
    pub fn path(&self, date: NaiveDate) -> PathBuf {
        self.logs_dir
            .join(format!("{}.{}", date.format(DATE_FORMAT), DOC_EXTENSION))
    }

    pub fn exists(&self, date: NaiveDate) -> bool {
        self.path(date).exists()
    }

    /// Loads a date's document.
    ///
    /// Returns `Ok(None)` if the file doesn't exist.
    pub fn load(&self, date: NaiveDate) -> Result<Option<AutoCommit>, StorageError> {
        let path = self.path(date);

        match fs::read(&path) {
            Ok(bytes) => {
                let doc = AutoCommit::load(&bytes)
                    .map_err(|e| StorageError::LoadError(path, e.to_string()))?;
                Ok(Some(doc))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(path, e)),
        }
    }

    /// Saves a date's document.
    ///
    /// The bytes are written to a temporary file and renamed into place, so
    /// a reader sees either the previous document or the new one.
    pub fn save(&self, date: NaiveDate, doc: &mut AutoCommit) -> Result<(), StorageError> {
        fs::create_dir_all(&self.logs_dir)
            .map_err(|e| StorageError::IoError(self.logs_dir.clone(), e))?;

        let path = self.path(date);
        let tmp_path = path.with_extension(format!("{}.tmp", DOC_EXTENSION));
        let bytes = doc.save();

        fs::write(&tmp_path, bytes).map_err(|e| StorageError::IoError(tmp_path.clone(), e))?;
        fs::rename(&tmp_path, &path).map_err(|e| StorageError::IoError(path, e))?;

        Ok(())
    }

    /// Lists the dates that have a document, in no particular order.
    pub fn list_dates(&self) -> Result<Vec<NaiveDate>, StorageError> {
        let entries = match fs::read_dir(&self.logs_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::IoError(self.logs_dir.clone(), e)),
        };

        let mut dates = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| StorageError::IoError(self.logs_dir.clone(), e))?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            // Skips leftover temp files too
            if path.extension().and_then(|s| s.to_str()) != Some(DOC_EXTENSION) {
                continue;
            }

            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                match NaiveDate::parse_from_str(stem, DATE_FORMAT) {
                    Ok(date) => dates.push(date),
                    Err(_) => tracing::warn!("Ignoring unexpected document {}", path.display()),
                }
            }
        }

        Ok(dates)
    }
}

/// Errors that can occur during document storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error for {}: {1}", .0.display())]
    IoError(PathBuf, #[source] io::Error),

    #[error("Failed to load document {}: {1}", .0.display())]
    LoadError(PathBuf, String),
}
