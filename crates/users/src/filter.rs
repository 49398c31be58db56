//! Filter expressions attached to get/list/remove requests.
//!
//! Accepts both `{property, comparator, value}` and the compact
//! `{property, value: "eq:42"}` form where the comparator is a value prefix.

use core::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Comparator {
    #[default]
    Eq,
    Neq,
    Like,
    NotLike,
    In,
    NotIn,
    Gt,
    Gte,
    Lt,
    Lte,
    IsNull,
    IsNotNull,
}

impl Comparator {
    pub fn parse(token: &str) -> Option<Self> {
        serde_json::from_value(Value::String(token.to_string())).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFilter")]
pub struct Filter {
    pub property: String,
    pub comparator: Comparator,
    pub value: Value,
}

#[derive(Deserialize)]
struct RawFilter {
    property: String,
    #[serde(default, alias = "operator")]
    comparator: Option<Comparator>,
    #[serde(default)]
    value: Value,
}

impl From<RawFilter> for Filter {
    fn from(raw: RawFilter) -> Self {
        if let Some(comparator) = raw.comparator {
            return Filter::new(raw.property, comparator, raw.value);
        }

        if let Value::String(s) = &raw.value {
            if let Some((prefix, rest)) = s.split_once(':') {
                if let Some(comparator) = Comparator::parse(prefix) {
                    return Filter::new(raw.property, comparator, Value::String(rest.to_string()));
                }
            }
        }

        Filter::new(raw.property, Comparator::Eq, raw.value)
    }
}

impl Filter {
    pub fn new(property: impl Into<String>, comparator: Comparator, value: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            comparator,
            value: value.into(),
        }
    }

    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(property, Comparator::Eq, value)
    }

    /// Evaluate against a flat projection of an entity.
    pub fn matches(&self, record: &Map<String, Value>) -> bool {
        let actual = record.get(&self.property).unwrap_or(&Value::Null);
        match self.comparator {
            Comparator::Eq => loosely_equal(actual, &self.value),
            Comparator::Neq => !loosely_equal(actual, &self.value),
            Comparator::Like => like(actual, &self.value),
            Comparator::NotLike => !like(actual, &self.value),
            Comparator::In => one_of(actual, &self.value),
            Comparator::NotIn => !one_of(actual, &self.value),
            Comparator::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
            Comparator::Gte => matches!(compare(actual, &self.value), Some(Ordering::Greater | Ordering::Equal)),
            Comparator::Lt => compare(actual, &self.value) == Some(Ordering::Less),
            Comparator::Lte => matches!(compare(actual, &self.value), Some(Ordering::Less | Ordering::Equal)),
            Comparator::IsNull => actual.is_null(),
            Comparator::IsNotNull => !actual.is_null(),
        }
    }
}

/// Value of the last equality filter on `property`, if any.
pub fn find_equal<'a>(filters: &'a [Filter], property: &str) -> Option<&'a Value> {
    filters
        .iter()
        .rev()
        .find(|f| f.property == property && f.comparator == Comparator::Eq)
        .map(|f| &f.value)
}

pub fn matches_all(filters: &[Filter], record: &Map<String, Value>) -> bool {
    filters.iter().all(|f| f.matches(record))
}

fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Array(items), _) if !expected.is_array() => items.iter().any(|i| loosely_equal(i, expected)),
        (Value::Number(a), Value::String(b)) | (Value::String(b), Value::Number(a)) => {
            b.parse::<f64>().ok() == a.as_f64()
        }
        (Value::Bool(a), Value::String(b)) | (Value::String(b), Value::Bool(a)) => {
            matches!((*a, b.as_str()), (true, "true" | "1") | (false, "false" | "0"))
        }
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => actual == expected,
    }
}

fn one_of(actual: &Value, candidates: &Value) -> bool {
    match candidates {
        Value::Array(items) => items.iter().any(|c| loosely_equal(actual, c)),
        Value::String(s) => s.split(',').any(|c| loosely_equal(actual, &Value::String(c.trim().to_string()))),
        other => loosely_equal(actual, other),
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), _) => a.as_f64()?.partial_cmp(&as_f64(expected)?),
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::String(a), Value::Number(b)) => a.parse::<f64>().ok()?.partial_cmp(&b.as_f64()?),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// SQL `LIKE`: `%` matches any run, `_` one character, anything else is
/// literal. Case-insensitive and anchored at both ends.
fn like(actual: &Value, pattern: &Value) -> bool {
    let (Some(text), Some(pattern)) = (actual.as_str(), pattern.as_str()) else {
        return false;
    };

    match like_regex(pattern) {
        Ok(re) => re.is_match(text),
        Err(err) => {
            tracing::debug!(pattern, %err, "unusable LIKE pattern");
            false
        }
    }
}

fn like_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut source = String::from("^");
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '%' | '_' => {
                source.push_str(&regex::escape(&literal));
                literal.clear();
                source.push_str(if c == '%' { ".*" } else { "." });
            }
            other => literal.push(other),
        }
    }
    source.push_str(&regex::escape(&literal));
    source.push('$');

    RegexBuilder::new(&source).case_insensitive(true).dot_matches_new_line(true).build()
}
