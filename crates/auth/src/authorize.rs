use thiserror::Error;

use crate::{Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(Permission),

    #[error("forbidden: requires one of {0:?}")]
    ForbiddenAny(Vec<Permission>),
}

/// Authorize a principal against a single permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: Permission) -> Result<(), AuthzError> {
    if principal.is_granted(required) {
        Ok(())
    } else {
        tracing::debug!(principal = %principal.id(), permission = %required, "permission missing");
        Err(AuthzError::Forbidden(required))
    }
}

/// Authorize a principal against a set of alternatives (OR-combined).
pub fn authorize_any(principal: &Principal, alternatives: &[Permission]) -> Result<(), AuthzError> {
    if principal.is_granted_any(alternatives) {
        Ok(())
    } else {
        tracing::debug!(principal = %principal.id(), ?alternatives, "no alternative permission held");
        Err(AuthzError::ForbiddenAny(alternatives.to_vec()))
    }
}
