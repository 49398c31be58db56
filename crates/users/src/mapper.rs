//! Maps a submitted payload onto a user record.
//!
//! Only profile data is mapped. `id`, `active`, `plainPassword` and
//! `sendPassword` are handled by the controller itself.

use serde_json::Value;

use backoffice_core::{DomainError, DomainResult, GroupId, PermissionId};

use crate::payload::{Payload, fields};
use crate::persistence::PersistenceHandler;
use crate::record::UserRecord;
use crate::validation::ValidationResult;

pub const INVALID_VALUE: &str = "This value is not valid.";

/// Copy mappable fields from `payload` onto `user`.
///
/// Malformed values and unknown group/permission ids become field errors;
/// the record is still updated with everything that could be mapped. Only
/// storage failures are returned as `Err`.
pub fn map_onto(
    payload: &Payload,
    user: &mut UserRecord,
    persistence: &dyn PersistenceHandler,
) -> DomainResult<ValidationResult> {
    let mut errors = ValidationResult::new();

    for (key, value) in payload {
        match key.as_str() {
            fields::USERNAME => match value.as_str() {
                Some(s) => user.username = s.trim().to_string(),
                None => errors.add_field_error(key.clone(), INVALID_VALUE),
            },
            fields::EMAIL => match value.as_str() {
                Some(s) => user.email = s.trim().to_string(),
                None => errors.add_field_error(key.clone(), INVALID_VALUE),
            },
            fields::FIRST_NAME => map_optional_str(key, value, &mut user.first_name, &mut errors),
            fields::LAST_NAME => map_optional_str(key, value, &mut user.last_name, &mut errors),
            fields::MIDDLE_NAME => map_optional_str(key, value, &mut user.middle_name, &mut errors),
            fields::META => match value {
                Value::Object(meta) => user.meta = meta.clone(),
                Value::Null => user.meta.clear(),
                _ => errors.add_field_error(key.clone(), INVALID_VALUE),
            },
            fields::GROUPS => match parse_ids::<GroupId>(value) {
                Some(ids) => match resolve(persistence.resolve_groups(&ids))? {
                    Ok(groups) => user.groups = groups,
                    Err(message) => errors.add_field_error(key.clone(), message),
                },
                None => errors.add_field_error(key.clone(), INVALID_VALUE),
            },
            fields::PERMISSIONS => match parse_ids::<PermissionId>(value) {
                Some(ids) => match resolve(persistence.resolve_permissions(&ids))? {
                    Ok(permissions) => user.permissions = permissions,
                    Err(message) => errors.add_field_error(key.clone(), message),
                },
                None => errors.add_field_error(key.clone(), INVALID_VALUE),
            },
            _ => {}
        }
    }

    Ok(errors)
}

/// Shape checks for the password fields, which the mapper itself skips.
pub fn check_password_fields(payload: &Payload) -> ValidationResult {
    let mut errors = ValidationResult::new();

    if payload.get(fields::PLAIN_PASSWORD).is_some_and(|v| !v.is_null() && !v.is_string()) {
        errors.add_field_error(fields::PLAIN_PASSWORD, INVALID_VALUE);
    }
    if payload
        .get(fields::SEND_PASSWORD)
        .is_some_and(|v| matches!(v, Value::Array(_) | Value::Object(_)))
    {
        errors.add_field_error(fields::SEND_PASSWORD, INVALID_VALUE);
    }

    errors
}

fn map_optional_str(key: &str, value: &Value, target: &mut Option<String>, errors: &mut ValidationResult) {
    match value {
        Value::Null => *target = None,
        Value::String(s) if s.trim().is_empty() => *target = None,
        Value::String(s) => *target = Some(s.trim().to_string()),
        _ => errors.add_field_error(key, INVALID_VALUE),
    }
}

/// Ids arrive as an array of strings or of `{ "id": ... }` objects; null clears.
fn parse_ids<T: core::str::FromStr>(value: &Value) -> Option<Vec<T>> {
    match value {
        Value::Null => Some(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.parse().ok(),
                Value::Object(obj) => obj.get("id").and_then(Value::as_str).and_then(|s| s.parse().ok()),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

/// Separate lookup misses (field errors) from storage failures.
fn resolve<T>(result: DomainResult<T>) -> DomainResult<Result<T, String>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(DomainError::Validation(message)) => Ok(Err(message)),
        Err(other) => Err(other),
    }
}
