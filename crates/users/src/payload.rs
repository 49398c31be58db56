//! Request parameters as sent by the backend UI, and helpers to read them.
//!
//! Payload records are kept as loose JSON maps: the policies below reason
//! about which *keys* a caller sent, not only about their typed values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use backoffice_core::UserId;

use crate::filter::Filter;
use crate::hydration::HydrationRequest;

/// A single record as submitted by the client.
pub type Payload = Map<String, Value>;

/// Payload keys understood by the users endpoints.
pub mod fields {
    pub const ID: &str = "id";
    pub const USERNAME: &str = "username";
    pub const EMAIL: &str = "email";
    pub const FIRST_NAME: &str = "firstName";
    pub const LAST_NAME: &str = "lastName";
    pub const MIDDLE_NAME: &str = "middleName";
    pub const META: &str = "meta";
    pub const ACTIVE: &str = "active";
    pub const GROUPS: &str = "groups";
    pub const PERMISSIONS: &str = "permissions";
    pub const PLAIN_PASSWORD: &str = "plainPassword";
    pub const SEND_PASSWORD: &str = "sendPassword";
}

/// Parameters of one CRUD request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestParams {
    /// Single-record payload (create, update, single-record batch update).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<Payload>,
    /// Multi-record payload (batch update).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<Payload>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hydration: Option<HydrationRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl RequestParams {
    pub fn with_record(record: Payload) -> Self {
        Self {
            record: Some(record),
            ..Default::default()
        }
    }

    pub fn with_records(records: Vec<Payload>) -> Self {
        Self {
            records: Some(records),
            ..Default::default()
        }
    }

    pub fn with_filter(filter: Vec<Filter>) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn hydrate_with(mut self, hydration: HydrationRequest) -> Self {
        self.hydration = Some(hydration);
        self
    }

    /// Every record carried by the request, single or batch.
    pub fn all_records(&self) -> impl Iterator<Item = &Payload> {
        self.record.iter().chain(self.records.iter().flatten())
    }
}

/// Convenience readers over a [`Payload`].
pub trait PayloadExt {
    /// Key present with a non-null value.
    fn is_set(&self, key: &str) -> bool;

    /// Key present with a truthy value (see [`is_truthy`]).
    fn is_truthy(&self, key: &str) -> bool;

    /// Key holding a non-empty string.
    fn non_empty_str(&self, key: &str) -> Option<&str>;

    /// Key holding something that parses as a user id.
    fn user_id(&self, key: &str) -> Option<UserId>;
}

impl PayloadExt for Payload {
    fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_null())
    }

    fn is_truthy(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_truthy)
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    fn user_id(&self, key: &str) -> Option<UserId> {
        self.get(key).and_then(value_as_user_id)
    }
}

/// Loose truthiness used for flags coming from form submissions.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

pub fn value_as_user_id(value: &Value) -> Option<UserId> {
    value.as_str().and_then(|s| s.parse().ok())
}
