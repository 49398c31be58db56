use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Permission identifier.
///
/// Permissions form a closed vocabulary: a misspelled permission is a compile
/// error rather than a silently failing check. Serialized names match the
/// backend's role tokens without the `ROLE_` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Create, edit and remove any user profile.
    ManageUserProfiles,
    /// Change which permissions a user holds.
    ManagePermissions,
    /// Edit and view profile information of other users.
    ManageUserProfileInformation,
    /// Open the security section of the backend tools (user listings).
    AccessBackendToolsSecuritySection,
    /// The built-in super administrator.
    RootUser,
    /// Present while an administrator is impersonating another user.
    PreviousAdmin,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::ManageUserProfiles,
        Permission::ManagePermissions,
        Permission::ManageUserProfileInformation,
        Permission::AccessBackendToolsSecuritySection,
        Permission::RootUser,
        Permission::PreviousAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageUserProfiles => "MANAGE_USER_PROFILES",
            Permission::ManagePermissions => "MANAGE_PERMISSIONS",
            Permission::ManageUserProfileInformation => "MANAGE_USER_PROFILE_INFORMATION",
            Permission::AccessBackendToolsSecuritySection => "ACCESS_BACKEND_TOOLS_SECURITY_SECTION",
            Permission::RootUser => "ROOT_USER",
            Permission::PreviousAdmin => "PREVIOUS_ADMIN",
        }
    }

    /// Role token as used by session/security layers (`ROLE_` prefixed).
    pub fn role_name(&self) -> String {
        format!("ROLE_{}", self.as_str())
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown permission '{0}'")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let bare = name.strip_prefix("ROLE_").unwrap_or(name);
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == bare)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}
