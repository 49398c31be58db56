use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use backoffice_core::UserId;

use crate::Permission;

/// The authenticated caller of a request.
///
/// Construction is decoupled from session storage and transport: the hosting
/// layer resolves the session and hands a `Principal` to every policy call.
/// A principal never changes during a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: UserId,
    permissions: BTreeSet<Permission>,
}

impl Principal {
    pub fn new(id: UserId, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            id,
            permissions: permissions.into_iter().collect(),
        }
    }

    /// A principal holding no permissions at all.
    pub fn unprivileged(id: UserId) -> Self {
        Self::new(id, [])
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn permissions(&self) -> &BTreeSet<Permission> {
        &self.permissions
    }

    pub fn is_granted(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// OR-combination: true if any of `permissions` is held.
    pub fn is_granted_any(&self, permissions: &[Permission]) -> bool {
        permissions.iter().any(|p| self.is_granted(*p))
    }

    /// Whether `user_id` identifies the caller itself.
    pub fn is(&self, user_id: &UserId) -> bool {
        self.id == *user_id
    }
}
