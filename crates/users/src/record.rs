//! The user account entity managed by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use backoffice_core::{Entity, GroupId, PermissionId, UserId};

/// Lifecycle state of an account, persisted as a small integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum UserState {
    /// Created but never activated.
    #[default]
    New,
    Active,
}

impl UserState {
    pub fn code(self) -> u8 {
        match self {
            UserState::New => 0,
            UserState::Active => 1,
        }
    }
}

impl From<UserState> for u8 {
    fn from(value: UserState) -> Self {
        value.code()
    }
}

impl TryFrom<u8> for UserState {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(UserState::New),
            1 => Ok(UserState::Active),
            other => Err(format!("unknown user state code {other}")),
        }
    }
}

/// A group the user is a member of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: GroupId,
    pub name: String,
}

/// A permission granted directly to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRef {
    pub id: PermissionId,
    pub name: String,
}

/// Stored password hash (PHC string). Never serialized, never projected.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_phc(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// User account.
///
/// Deliberately not `Serialize`: responses are built through hydration groups
/// so the credential can never leak into a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub active: bool,
    pub state: UserState,
    pub last_login: Option<DateTime<Utc>>,
    pub groups: Vec<GroupRef>,
    pub permissions: Vec<PermissionRef>,
    pub meta: Map<String, Value>,
    pub credential: Option<Credential>,
    pub password_changed_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn new(id: UserId, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            first_name: None,
            last_name: None,
            middle_name: None,
            active: true,
            state: UserState::New,
            last_login: None,
            groups: Vec::new(),
            permissions: Vec::new(),
            meta: Map::new(),
            credential: None,
            password_changed_at: None,
        }
    }

    /// Blank record used as the target of create-time data mapping.
    pub fn blank() -> Self {
        Self::new(UserId::new(), "", "")
    }

    /// "First Last", skipping missing parts.
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn has_password(&self) -> bool {
        self.credential.is_some()
    }
}

impl Entity for UserRecord {
    type Id = UserId;

    const CLASS: &'static str = "User";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
