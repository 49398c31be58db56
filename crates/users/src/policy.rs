//! Action authorization policy for the users endpoints.
//!
//! Each action maps to an [`ActionRule`]: either a plain permission
//! requirement or a pure predicate over the principal and the request.

use serde::{Deserialize, Serialize};

use backoffice_auth::{Permission, Principal};

use crate::filter::find_equal;
use crate::payload::{PayloadExt, RequestParams, fields, value_as_user_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CrudAction {
    Create,
    Update,
    Get,
    List,
    Remove,
    BatchUpdate,
}

impl CrudAction {
    pub const ALL: [CrudAction; 6] = [
        CrudAction::Create,
        CrudAction::Update,
        CrudAction::Get,
        CrudAction::List,
        CrudAction::Remove,
        CrudAction::BatchUpdate,
    ];
}

impl core::fmt::Display for CrudAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            CrudAction::Create => "create",
            CrudAction::Update => "update",
            CrudAction::Get => "get",
            CrudAction::List => "list",
            CrudAction::Remove => "remove",
            CrudAction::BatchUpdate => "batchUpdate",
        };
        f.write_str(name)
    }
}

pub type PolicyFn = fn(&Principal, &RequestParams) -> bool;

/// Declarative authorization rule for one action.
#[derive(Debug, Clone, Copy)]
pub enum ActionRule {
    Requires(Permission),
    Custom(PolicyFn),
}

impl ActionRule {
    pub fn evaluate(&self, principal: &Principal, params: &RequestParams) -> bool {
        match self {
            ActionRule::Requires(permission) => principal.is_granted(*permission),
            ActionRule::Custom(policy) => policy(principal, params),
        }
    }
}

const PROFILE_MANAGERS: [Permission; 2] = [
    Permission::ManageUserProfiles,
    Permission::ManageUserProfileInformation,
];

pub fn action_rule(action: CrudAction) -> ActionRule {
    match action {
        CrudAction::Create => ActionRule::Requires(Permission::ManageUserProfiles),
        CrudAction::Update => ActionRule::Custom(can_update),
        CrudAction::Get => ActionRule::Custom(can_get),
        CrudAction::List => ActionRule::Requires(Permission::AccessBackendToolsSecuritySection),
        CrudAction::Remove => ActionRule::Requires(Permission::ManageUserProfiles),
        CrudAction::BatchUpdate => ActionRule::Custom(can_batch_update),
    }
}

/// Whether `principal` may perform `action` with `params`.
pub fn authorize(action: CrudAction, principal: &Principal, params: &RequestParams) -> bool {
    let allowed = action_rule(action).evaluate(principal, params);
    tracing::debug!(%action, principal = %principal.id(), allowed, "action policy evaluated");
    allowed
}

/// Single-record update.
///
/// Touching `permissions` needs `MANAGE_PERMISSIONS` no matter what else is
/// held. Profile managers may edit anyone; everybody else only their own
/// record, identified by an explicit `record.id`.
fn can_update(principal: &Principal, params: &RequestParams) -> bool {
    let record = params.record.as_ref();

    if record.is_some_and(|r| r.is_set(fields::PERMISSIONS)) && !principal.is_granted(Permission::ManagePermissions) {
        return false;
    }

    if principal.is_granted_any(&PROFILE_MANAGERS) {
        return true;
    }

    record
        .and_then(|r| r.user_id(fields::ID))
        .is_some_and(|id| principal.is(&id))
}

/// Anyone may load their own record through an `id` equality filter.
fn can_get(principal: &Principal, params: &RequestParams) -> bool {
    let requested = find_equal(&params.filter, fields::ID).and_then(value_as_user_id);
    if requested.is_some_and(|id| principal.is(&id)) {
        return true;
    }

    principal.is_granted_any(&PROFILE_MANAGERS)
}

/// Batch update never grants the self-edit exception.
fn can_batch_update(principal: &Principal, params: &RequestParams) -> bool {
    let touches_permissions = params.all_records().any(|r| r.is_set(fields::PERMISSIONS));
    if touches_permissions && !principal.is_granted(Permission::ManagePermissions) {
        return false;
    }

    principal.is_granted(Permission::ManageUserProfiles)
}
