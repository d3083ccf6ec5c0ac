//! Per-item success/failure values.
//!
//! An [`Outcome`] always carries the subject it is about, so a stream of
//! outcomes can report each item's failure without ending the stream.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<S, E> {
    Success(S),
    Failure(S, E),
}

impl<S, E> Outcome<S, E> {
    /// The item this outcome reports on.
    pub fn subject(&self) -> &S {
        match self {
            Outcome::Success(subject) | Outcome::Failure(subject, _) => subject,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_, _))
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(_, error) => Some(error),
        }
    }

    /// Converts into a `Result`, keeping the subject on both sides.
    pub fn into_result(self) -> Result<S, (S, E)> {
        match self {
            Outcome::Success(subject) => Ok(subject),
            Outcome::Failure(subject, error) => Err((subject, error)),
        }
    }
}

impl<S: fmt::Display, E: fmt::Display> fmt::Display for Outcome<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(subject) => write!(f, "{}: ok", subject),
            Outcome::Failure(subject, error) => write!(f, "{}: {}", subject, error),
        }
    }
}
