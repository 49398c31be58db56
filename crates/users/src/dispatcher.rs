//! Side effects of a user update: the domain lifecycle operation before the
//! write, and one activity-log entry after it.

use std::sync::Arc;

use backoffice_activity::{ActivityEvent, ActivityLog, ActivityType};
use backoffice_auth::Principal;
use backoffice_core::DomainResult;

use crate::payload::{Payload, PayloadExt, fields};
use crate::record::UserRecord;
use crate::service::UserService;

/// What an update amounts to, for logging purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Enabled,
    Disabled,
    PasswordChanged,
    ProfileUpdated,
}

impl Mutation {
    /// Activation toggles win over password changes, which win over plain edits.
    pub fn classify(payload: &Payload) -> Self {
        if payload.is_set(fields::ACTIVE) {
            if payload.is_truthy(fields::ACTIVE) {
                Mutation::Enabled
            } else {
                Mutation::Disabled
            }
        } else if payload.non_empty_str(fields::PLAIN_PASSWORD).is_some() {
            Mutation::PasswordChanged
        } else {
            Mutation::ProfileUpdated
        }
    }

    pub fn activity_type(self) -> ActivityType {
        match self {
            Mutation::Enabled => ActivityType::ProfileEnabled,
            Mutation::Disabled => ActivityType::ProfileDisabled,
            Mutation::PasswordChanged => ActivityType::PasswordChanged,
            Mutation::ProfileUpdated => ActivityType::ProfileUpdated,
        }
    }

    pub fn message(self, user: &UserRecord) -> String {
        let username = &user.username;
        match self {
            Mutation::Enabled => format!("Profile enabled for user \"{username}\"."),
            Mutation::Disabled => format!("Profile disabled for user \"{username}\"."),
            Mutation::PasswordChanged => format!("Password has been changed for user \"{username}\"."),
            Mutation::ProfileUpdated => format!("Profile data is changed for user \"{username}\"."),
        }
    }
}

pub struct SideEffectDispatcher {
    service: Arc<dyn UserService>,
    activity: Arc<dyn ActivityLog>,
}

impl SideEffectDispatcher {
    pub fn new(service: Arc<dyn UserService>, activity: Arc<dyn ActivityLog>) -> Self {
        Self { service, activity }
    }

    /// Run the domain operation for `mutation` on the not yet persisted record.
    pub fn before_persist(&self, mutation: Mutation, user: &mut UserRecord) -> DomainResult<()> {
        match mutation {
            Mutation::Enabled => self.service.enable(user),
            Mutation::Disabled => self.service.disable(user),
            Mutation::PasswordChanged | Mutation::ProfileUpdated => Ok(()),
        }
    }

    /// Append the activity entry. Failures are logged and swallowed: the
    /// mutation is already committed.
    pub fn after_persist(&self, mutation: Mutation, user: &UserRecord, author: &Principal) {
        let event = ActivityEvent::new(mutation.activity_type(), mutation.message(user), author.id());
        if let Err(err) = self.activity.record(&event) {
            tracing::warn!(
                error = %format!("{err:#}"),
                activity = %event.activity_type,
                user = %user.id,
                "failed to record activity"
            );
        }
    }
}
