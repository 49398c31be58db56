//! Domain user service: account lifecycle operations.

use std::sync::Arc;

use backoffice_core::{DomainError, DomainResult, UserId};

use crate::persistence::{OperationResult, PersistenceHandler};
use crate::record::{UserRecord, UserState};

/// Lifecycle operations with domain rules attached.
///
/// `enable`/`disable` mutate the record in place; the caller persists it.
pub trait UserService: Send + Sync {
    fn enable(&self, user: &mut UserRecord) -> DomainResult<()>;

    fn disable(&self, user: &mut UserRecord) -> DomainResult<()>;

    fn remove(&self, users: &[UserRecord]) -> DomainResult<OperationResult>;
}

pub struct DefaultUserService {
    persistence: Arc<dyn PersistenceHandler>,
    root_user_id: Option<UserId>,
}

impl DefaultUserService {
    pub fn new(persistence: Arc<dyn PersistenceHandler>, root_user_id: Option<UserId>) -> Self {
        Self {
            persistence,
            root_user_id,
        }
    }

    fn ensure_not_root(&self, user: &UserRecord, what: &str) -> DomainResult<()> {
        if self.root_user_id == Some(user.id) {
            return Err(DomainError::invariant(format!("the root user cannot be {what}")));
        }
        Ok(())
    }
}

impl UserService for DefaultUserService {
    fn enable(&self, user: &mut UserRecord) -> DomainResult<()> {
        user.active = true;
        user.state = UserState::Active;
        tracing::info!(user = %user.id, "user enabled");
        Ok(())
    }

    fn disable(&self, user: &mut UserRecord) -> DomainResult<()> {
        self.ensure_not_root(user, "disabled")?;
        user.active = false;
        tracing::info!(user = %user.id, "user disabled");
        Ok(())
    }

    fn remove(&self, users: &[UserRecord]) -> DomainResult<OperationResult> {
        for user in users {
            self.ensure_not_root(user, "removed")?;
        }
        let result = self.persistence.remove(users)?;
        tracing::info!(count = result.removed.len(), "users removed");
        Ok(result)
    }
}
