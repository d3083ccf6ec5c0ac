//! The signed-in user as seen by the data layer.
//!
//! Authentication happens elsewhere; this module only carries its result.
//! The online repository is scoped to a [`User`], and whether one is signed
//! in decides which repository is active.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Name, then email, then id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.email {
            Some(email) => write!(f, "{} <{}>", self.display_name(), email),
            None => write!(f, "{}", self.display_name()),
        }
    }
}

/// Whether a user is currently signed in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdentityState {
    #[default]
    SignedOut,
    SignedIn(User),
}

impl IdentityState {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, IdentityState::SignedIn(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            IdentityState::SignedIn(user) => Some(user),
            IdentityState::SignedOut => None,
        }
    }
}

impl From<Option<User>> for IdentityState {
    fn from(user: Option<User>) -> Self {
        match user {
            Some(user) => IdentityState::SignedIn(user),
            None => IdentityState::SignedOut,
        }
    }
}
