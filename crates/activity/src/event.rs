use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use backoffice_core::UserId;

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - designed to be **append-only**
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "user.profile_enabled").
    fn event_type(&self) -> &'static str;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Kind of change recorded in the activity log for a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    #[serde(rename = "user.profile_enabled")]
    ProfileEnabled,
    #[serde(rename = "user.profile_disabled")]
    ProfileDisabled,
    #[serde(rename = "user.password_changed")]
    PasswordChanged,
    #[serde(rename = "user.profile_updated")]
    ProfileUpdated,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::ProfileEnabled => "user.profile_enabled",
            ActivityType::ProfileDisabled => "user.profile_disabled",
            ActivityType::PasswordChanged => "user.password_changed",
            ActivityType::ProfileUpdated => "user.profile_updated",
        }
    }
}

impl core::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the activity log: what happened, in words, and who did it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub message: String,
    pub author: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(activity_type: ActivityType, message: impl Into<String>, author: UserId) -> Self {
        Self {
            activity_type,
            message: message.into(),
            author,
            occurred_at: Utc::now(),
        }
    }
}

impl Event for ActivityEvent {
    fn event_type(&self) -> &'static str {
        self.activity_type.as_str()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
