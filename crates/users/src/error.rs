use thiserror::Error;

use backoffice_auth::AuthzError;
use backoffice_core::DomainError;

use crate::hydration::HydrationError;
use crate::password::{BadPassword, PasswordError};
use crate::validation::ValidationResult;

pub type UsersResult<T> = Result<T, UsersError>;

/// Failure of a users endpoint request.
#[derive(Debug, Error)]
pub enum UsersError {
    /// Rejected by policy before anything was changed.
    #[error("access denied")]
    AccessDenied,

    #[error("validation failed")]
    ValidationFailed(ValidationResult),

    /// Request-level password rejection (create). Carries the first message.
    #[error("bad password: {0}")]
    BadPassword(String),

    #[error("user not found")]
    NotFound,

    #[error(transparent)]
    Hydration(#[from] HydrationError),

    #[error(transparent)]
    Password(PasswordError),

    #[error(transparent)]
    Domain(DomainError),
}

impl From<AuthzError> for UsersError {
    fn from(_: AuthzError) -> Self {
        UsersError::AccessDenied
    }
}

impl From<BadPassword> for UsersError {
    fn from(err: BadPassword) -> Self {
        UsersError::BadPassword(err.first_error().to_string())
    }
}

impl From<PasswordError> for UsersError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Bad(bad) => bad.into(),
            other => UsersError::Password(other),
        }
    }
}

impl From<DomainError> for UsersError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound => UsersError::NotFound,
            other => UsersError::Domain(other),
        }
    }
}

impl From<ValidationResult> for UsersError {
    fn from(result: ValidationResult) -> Self {
        UsersError::ValidationFailed(result)
    }
}
