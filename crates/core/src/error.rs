//! Errors raised by user storage and account lifecycle rules.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Failure below the request layer.
///
/// Storage backends and the account lifecycle service report through this
/// type; the users controller decides how each kind surfaces to the caller.
/// Permission checks have their own error in `backoffice-auth`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced group or permission does not exist, or a value is malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An account rule forbids the change (e.g. disabling the root user).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A user, group or permission id did not parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The user to change does not exist.
    #[error("not found")]
    NotFound,

    /// The write clashes with stored data (duplicate id or username).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
