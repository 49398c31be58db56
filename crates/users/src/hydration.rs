//! Field visibility table: which fields of a [`UserRecord`] each view exposes.
//!
//! A *group* is one projection of a user. A *profile* is what an endpoint may
//! ask for: an ordered set of groups whose projections are merged into one
//! flat map. Because groups are an enum, a profile can only reference groups
//! that exist.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::record::UserRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HydrationGroup {
    /// Editable identity fields shown in the profile form.
    MainForm,
    /// Full listing row: memberships and grants by name.
    List,
    /// Compact row for embedding: memberships and grants by id.
    CompactList,
    /// Just enough to tell the operator what was deleted.
    DeleteUser,
}

impl HydrationGroup {
    pub const ALL: [HydrationGroup; 4] = [
        HydrationGroup::MainForm,
        HydrationGroup::List,
        HydrationGroup::CompactList,
        HydrationGroup::DeleteUser,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HydrationGroup::MainForm => "main-form",
            HydrationGroup::List => "list",
            HydrationGroup::CompactList => "compact-list",
            HydrationGroup::DeleteUser => "delete-user",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.name() == name)
    }
}

/// Named set of groups an endpoint view may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HydrationProfile {
    pub name: &'static str,
    pub groups: &'static [HydrationGroup],
}

/// Profile used when embedding users into a group's member list.
pub const GROUP_MEMBERS_PROFILE: &str = "modera-backend-security-group-groupusers";

pub const PROFILES: &[HydrationProfile] = &[
    HydrationProfile {
        name: "list",
        groups: &[HydrationGroup::List],
    },
    HydrationProfile {
        name: "delete-user",
        groups: &[HydrationGroup::DeleteUser],
    },
    HydrationProfile {
        name: "main-form",
        groups: &[HydrationGroup::MainForm],
    },
    HydrationProfile {
        name: "compact-list",
        groups: &[HydrationGroup::CompactList],
    },
    HydrationProfile {
        name: GROUP_MEMBERS_PROFILE,
        groups: &[HydrationGroup::CompactList],
    },
];

pub fn profile(name: &str) -> Option<&'static HydrationProfile> {
    PROFILES.iter().find(|p| p.name == name)
}

/// Client-side choice of profile (and optionally a subset of its groups).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationRequest {
    pub profile: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group: Vec<String>,
}

impl HydrationRequest {
    pub fn profile(name: impl Into<String>) -> Self {
        Self {
            profile: name.into(),
            group: Vec::new(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HydrationError {
    #[error("unknown hydration profile '{0}'")]
    UnknownProfile(String),

    #[error("unknown hydration group '{0}'")]
    UnknownGroup(String),

    #[error("hydration group '{group}' is not available in profile '{profile}'")]
    GroupNotInProfile { profile: String, group: String },
}

/// Resolve which groups a request selects, in profile order.
pub fn resolve_groups(request: &HydrationRequest) -> Result<Vec<HydrationGroup>, HydrationError> {
    let profile = profile(&request.profile).ok_or_else(|| HydrationError::UnknownProfile(request.profile.clone()))?;

    if request.group.is_empty() {
        return Ok(profile.groups.to_vec());
    }

    let mut selected = Vec::with_capacity(request.group.len());
    for name in &request.group {
        let group = HydrationGroup::parse(name).ok_or_else(|| HydrationError::UnknownGroup(name.clone()))?;
        if !profile.groups.contains(&group) {
            return Err(HydrationError::GroupNotInProfile {
                profile: profile.name.to_string(),
                group: name.clone(),
            });
        }
        selected.push(group);
    }
    Ok(profile
        .groups
        .iter()
        .copied()
        .filter(|g| selected.contains(g))
        .collect())
}

/// Hydrate one user through a profile request.
pub fn hydrate(user: &UserRecord, request: &HydrationRequest) -> Result<Map<String, Value>, HydrationError> {
    let groups = resolve_groups(request)?;
    let mut merged = Map::new();
    for group in groups {
        merged.extend(project(user, group));
    }
    Ok(merged)
}

/// Project a user through a single group.
pub fn project(user: &UserRecord, group: HydrationGroup) -> Map<String, Value> {
    let value = match group {
        HydrationGroup::MainForm => json!({
            "id": user.id.to_string(),
            "username": user.username,
            "email": user.email,
            "firstName": user.first_name,
            "lastName": user.last_name,
            "middleName": user.middle_name,
            "meta": user.meta,
        }),
        HydrationGroup::List => json!({
            "id": user.id.to_string(),
            "username": user.username,
            "email": user.email,
            "firstName": user.first_name,
            "lastName": user.last_name,
            "middleName": user.middle_name,
            "isActive": user.active,
            "state": user.state.code(),
            "lastLogin": user
                .last_login
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, false)),
            "groups": user.groups.iter().map(|g| g.name.clone()).collect::<Vec<_>>(),
            "permissions": user.permissions.iter().map(|p| p.name.clone()).collect::<Vec<_>>(),
            "meta": user.meta,
        }),
        HydrationGroup::CompactList => json!({
            "id": user.id.to_string(),
            "username": user.username,
            "fullname": user.full_name(),
            "isActive": user.active,
            "state": user.state.code(),
            "groups": user.groups.iter().map(|g| g.id.to_string()).collect::<Vec<_>>(),
            "permissions": user.permissions.iter().map(|p| p.id.to_string()).collect::<Vec<_>>(),
        }),
        HydrationGroup::DeleteUser => json!({
            "username": user.username,
        }),
    };

    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
