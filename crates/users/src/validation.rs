//! Field-keyed validation results and the entity validator contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::UserRecord;

/// Accumulated validation errors.
///
/// Errors are collected, never thrown one at a time, so a form can show every
/// problem in one round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    field_errors: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    general_errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.field_errors.entry(field.into()).or_default().push(message.into());
    }

    pub fn add_general_error(&mut self, message: impl Into<String>) {
        self.general_errors.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.field_errors.is_empty() || !self.general_errors.is_empty()
    }

    pub fn field_errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.field_errors
    }

    pub fn errors_for(&self, field: &str) -> &[String] {
        self.field_errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn general_errors(&self) -> &[String] {
        &self.general_errors
    }

    /// Fold `other` into `self`.
    pub fn merge(&mut self, other: ValidationResult) {
        for (field, messages) in other.field_errors {
            self.field_errors.entry(field).or_default().extend(messages);
        }
        self.general_errors.extend(other.general_errors);
    }

    /// Fold `other` into `self`, prefixing its field names (`records[2].email`).
    pub fn merge_prefixed(&mut self, prefix: &str, other: ValidationResult) {
        for (field, messages) in other.field_errors {
            self.field_errors
                .entry(format!("{prefix}.{field}"))
                .or_default()
                .extend(messages);
        }
        self.general_errors
            .extend(other.general_errors.into_iter().map(|m| format!("{prefix}: {m}")));
    }
}

/// Domain validation of a user entity after the request data was mapped onto it.
pub trait EntityValidator: Send + Sync {
    fn validate(&self, user: &UserRecord) -> ValidationResult;
}

/// Default constraints on user accounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserValidator;

impl UserValidator {
    pub const MAX_LENGTH: usize = 255;
}

impl EntityValidator for UserValidator {
    fn validate(&self, user: &UserRecord) -> ValidationResult {
        let mut result = ValidationResult::new();

        if user.username.trim().is_empty() {
            result.add_field_error("username", "This value should not be blank.");
        }

        if user.email.trim().is_empty() {
            result.add_field_error("email", "This value should not be blank.");
        } else if !looks_like_email(&user.email) {
            result.add_field_error("email", "This value is not a valid email address.");
        }

        let lengths = [
            ("username", Some(user.username.as_str())),
            ("email", Some(user.email.as_str())),
            ("firstName", user.first_name.as_deref()),
            ("lastName", user.last_name.as_deref()),
            ("middleName", user.middle_name.as_deref()),
        ];
        for (field, value) in lengths {
            if value.is_some_and(|v| v.chars().count() > Self::MAX_LENGTH) {
                result.add_field_error(
                    field,
                    format!("This value is too long. It should have {} characters or less.", Self::MAX_LENGTH),
                );
            }
        }

        result
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.trim().rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}
