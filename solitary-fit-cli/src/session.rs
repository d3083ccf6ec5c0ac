//! Sign-in state persisted between CLI runs.

use serde::{Deserialize, Serialize};
use solitary_fit_core::identity::{IdentityState, User};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The signed-in user and every user that has signed in on this device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    #[serde(skip_serializing_if = "Option::is_none")]
    current_user: Option<User>,
    history: BTreeSet<String>,
}

impl Session {
    /// Loads the session at `path`; a missing file is a signed-out session.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(SessionError::ReadError(path.to_path_buf(), e)),
        };

        let session: Option<Self> = serde_yaml::from_str(&contents)
            .map_err(|e| SessionError::ParseError(path.to_path_buf(), e))?;
        Ok(session.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SessionError::WriteError(parent.to_path_buf(), e))?;
        }
        let contents = serde_yaml::to_string(self)?;
        fs::write(path, contents).map_err(|e| SessionError::WriteError(path.to_path_buf(), e))
    }

    pub fn state(&self) -> IdentityState {
        self.current_user.clone().into()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current_user.is_some()
    }

    pub fn has_previously_signed_in(&self, user_id: &str) -> bool {
        self.history.contains(user_id)
    }

    /// Signs `user` in and adds them to the sign-in history.
    pub fn sign_in(&mut self, user: User) -> Result<(), SessionError> {
        if let Some(current) = &self.current_user {
            return Err(SessionError::AlreadySignedIn(current.display_name().to_string()));
        }
        self.history.insert(user.id.clone());
        self.current_user = Some(user);
        Ok(())
    }

    /// Signs the current user out and returns them.
    pub fn sign_out(&mut self) -> Result<User, SessionError> {
        self.current_user.take().ok_or(SessionError::NotSignedIn)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to read session file '{}': {1}", .0.display())]
    ReadError(PathBuf, #[source] io::Error),

    #[error("Failed to parse session file '{}': {1}", .0.display())]
    ParseError(PathBuf, #[source] serde_yaml::Error),

    #[error("Failed to write session file '{}': {1}", .0.display())]
    WriteError(PathBuf, #[source] io::Error),

    #[error("Failed to serialize session: {0}")]
    SerializeError(#[from] serde_yaml::Error),

    #[error("Already signed in as {0}. Sign out first.")]
    AlreadySignedIn(String),

    #[error("Not signed in")]
    NotSignedIn,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_signed_out() {
        let temp_dir = tempdir().unwrap();
        let session = Session::load(&temp_dir.path().join("session.yaml")).unwrap();

        assert!(!session.is_signed_in());
        assert_eq!(session.state(), IdentityState::SignedOut);
    }

    #[test]
    fn test_sign_in_records_history() {
        let mut session = Session::default();

        assert!(!session.has_previously_signed_in("u-1"));
        session.sign_in(User::new("u-1")).unwrap();
        assert!(session.is_signed_in());
        assert!(session.has_previously_signed_in("u-1"));
        assert!(!session.has_previously_signed_in("u-2"));

        let user = session.sign_out().unwrap();
        assert_eq!(user.id, "u-1");
        assert!(!session.is_signed_in());

        // history survives sign-out
        assert!(session.has_previously_signed_in("u-1"));
        session.sign_in(User::new("u-1")).unwrap();
    }

    #[test]
    fn test_double_sign_in_is_error() {
        let mut session = Session::default();
        session
            .sign_in(User::new("u-1").with_name("Alex"))
            .unwrap();

        let err = session.sign_in(User::new("u-2")).unwrap_err();
        assert!(matches!(err, SessionError::AlreadySignedIn(ref name) if name == "Alex"));
        assert_eq!(session.current_user().map(|u| u.id.as_str()), Some("u-1"));
        assert!(!session.has_previously_signed_in("u-2"));
    }

    #[test]
    fn test_sign_out_when_signed_out_is_error() {
        let mut session = Session::default();
        assert!(matches!(session.sign_out(), Err(SessionError::NotSignedIn)));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("session.yaml");

        let mut session = Session::default();
        session
            .sign_in(User::new("u-1").with_email("u1@example.com"))
            .unwrap();
        session.save(&path).unwrap();

        let loaded = Session::load(&path).unwrap();
        assert_eq!(loaded, session);
        assert_eq!(
            loaded.state().user().and_then(|u| u.email.as_deref()),
            Some("u1@example.com")
        );
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("session.yaml");
        fs::write(&path, "history: [").unwrap();

        let err = Session::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse session file"));
    }
}
