//! Field-level write guard for single-record updates.
//!
//! Callers without `MANAGE_USER_PROFILES` may only touch a small set of
//! profile fields, and may change a password only on their own account.

use backoffice_auth::{Permission, Principal};

use crate::payload::{Payload, fields};
use crate::record::UserRecord;
use crate::validation::ValidationResult;

pub const ACCESS_DENIED: &str = "Access denied.";

/// Fields any caller allowed to update a record may write.
pub const SELF_EDITABLE_FIELDS: [&str; 4] = [fields::ID, fields::FIRST_NAME, fields::LAST_NAME, fields::EMAIL];

/// Fields `principal` may write on `target`, or `None` when unrestricted.
pub fn writable_fields(principal: &Principal, target: &UserRecord) -> Option<Vec<&'static str>> {
    if principal.is_granted(Permission::ManageUserProfiles) {
        return None;
    }

    let mut allowed = SELF_EDITABLE_FIELDS.to_vec();
    if principal.is(&target.id) {
        allowed.push(fields::PLAIN_PASSWORD);
    }
    Some(allowed)
}

/// One "Access denied." field error per payload key outside the allow-list.
pub fn filter_write(principal: &Principal, target: &UserRecord, payload: &Payload) -> ValidationResult {
    let mut result = ValidationResult::new();

    let Some(allowed) = writable_fields(principal, target) else {
        return result;
    };

    for key in payload.keys() {
        if !allowed.contains(&key.as_str()) {
            result.add_field_error(key.clone(), ACCESS_DENIED);
        }
    }

    if result.has_errors() {
        tracing::debug!(
            principal = %principal.id(),
            target = %target.id,
            denied = ?result.field_errors().keys().collect::<Vec<_>>(),
            "field guard rejected update"
        );
    }

    result
}
