//! Nested-Struct Flattener
//!
//! Turns tree-shaped API records into the flat attribute maps a declarative
//! config system stores. Absent scalars are left out entirely, and a single
//! nested object becomes a list holding one map (empty when absent).

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Flat attribute mapping; ordered so equal inputs serialize identically
pub type Attributes = BTreeMap<String, Value>;

/// Records that can be flattened into attributes
pub trait Flatten {
    fn flatten(&self) -> Attributes;
}

/// Incrementally builds an [`Attributes`] map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributesBuilder {
    attrs: Attributes,
}

impl AttributesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    /// Set `key` only when the source field is present
    pub fn set_opt<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    /// Timestamps are rendered as RFC 3339 in UTC
    pub fn set_timestamp(self, key: &str, value: Option<&DateTime<Utc>>) -> Self {
        self.set_opt(key, value.map(format_timestamp))
    }

    /// Single nested object as a list of one; absent becomes `[]`
    pub fn set_nested<T: Flatten>(self, key: &str, value: Option<&T>) -> Self {
        self.set(key, nested_list(value))
    }

    pub fn build(self) -> Attributes {
        self.attrs
    }
}

/// Render a nested record in the list-of-one block shape
pub fn nested_list<T: Flatten>(value: Option<&T>) -> Value {
    Value::Array(value.map(|v| to_object(v.flatten())).into_iter().collect())
}

/// Convert attributes into a JSON object value
pub fn to_object(attrs: Attributes) -> Value {
    Value::Object(attrs.into_iter().collect::<Map<String, Value>>())
}

/// Format a timestamp the way the declarative store expects
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
