//! Data Source Registry - Load data source schemas from JSON
//!
//! Schemas are declared in embedded JSON files and loaded once. They drive
//! argument validation before a read and decide which attributes a read may
//! emit.

use super::Arguments;
use crate::lookup::Attributes;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use thiserror::Error;

/// Embedded schema JSON files (compiled into the binary)
const SCHEMA_FILES: &[&str] = &[
    include_str!("../schemas/vpc.json"),
    include_str!("../schemas/event_notifications.json"),
];

/// Every data source carries an implicit `id` attribute
pub const ID_ATTRIBUTE: &str = "id";

/// Argument validation failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{data_source}: missing required argument \"{field}\"")]
    MissingRequired {
        data_source: &'static str,
        field: String,
    },

    #[error("{data_source}: unsupported argument \"{field}\"")]
    UnknownArgument {
        data_source: &'static str,
        field: String,
    },

    #[error("{data_source}: exactly one of {} must be set", .fields.join(", "))]
    ExactlyOneOf {
        data_source: &'static str,
        fields: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Bool,
    List,
}

/// Attribute definition from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDef {
    #[serde(rename = "type")]
    pub kind: AttributeType,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exactly_one_of: Vec<String>,
    /// Nested block attributes for `list` types
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub elem: BTreeMap<String, AttributeDef>,
}

impl AttributeDef {
    /// Whether users may set this attribute
    pub fn is_argument(&self) -> bool {
        self.optional || self.required
    }
}

/// Data source definition from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceDef {
    #[serde(default)]
    pub description: String,
    pub attributes: BTreeMap<String, AttributeDef>,
}

impl DataSourceDef {
    /// Check user arguments against the schema before any remote call
    pub fn validate(&self, name: &'static str, args: &Arguments) -> Result<(), SchemaError> {
        for key in args.keys() {
            let is_argument = self
                .attributes
                .get(key)
                .map(AttributeDef::is_argument)
                .unwrap_or(false);
            if !is_argument {
                return Err(SchemaError::UnknownArgument {
                    data_source: name,
                    field: key.clone(),
                });
            }
        }

        let is_set = |key: &str| args.get(key).is_some_and(|v| !v.is_empty());

        for (key, attr) in &self.attributes {
            if attr.required && !is_set(key.as_str()) {
                return Err(SchemaError::MissingRequired {
                    data_source: name,
                    field: key.clone(),
                });
            }
        }

        let groups: BTreeSet<&Vec<String>> = self
            .attributes
            .values()
            .filter(|attr| !attr.exactly_one_of.is_empty())
            .map(|attr| &attr.exactly_one_of)
            .collect();

        for group in groups {
            let set_count = group.iter().filter(|key| is_set(key.as_str())).count();
            if set_count != 1 {
                return Err(SchemaError::ExactlyOneOf {
                    data_source: name,
                    fields: group.clone(),
                });
            }
        }

        Ok(())
    }

    /// Whether the schema declares `key` (the implicit `id` included)
    pub fn declares(&self, key: &str) -> bool {
        key == ID_ATTRIBUTE || self.attributes.contains_key(key)
    }

    /// Keep only declared attributes, logging anything dropped
    pub fn project(&self, name: &str, attrs: Attributes) -> Attributes {
        attrs
            .into_iter()
            .filter(|(key, _)| {
                let declared = self.declares(key);
                if !declared {
                    tracing::warn!("{}: dropping undeclared attribute {}", name, key);
                }
                declared
            })
            .collect()
    }
}

/// Root structure of schemas/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub data_sources: BTreeMap<String, DataSourceDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<SchemaConfig> = OnceLock::new();

/// Get the schema registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static SchemaConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = SchemaConfig {
            data_sources: BTreeMap::new(),
        };

        for content in SCHEMA_FILES {
            let partial: SchemaConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded schema JSON: {}", e));
            final_config.data_sources.extend(partial.data_sources);
        }

        final_config
    })
}

/// Get a data source definition and its static name
pub fn get_data_source(name: &str) -> Option<(&'static str, &'static DataSourceDef)> {
    get_registry()
        .data_sources
        .get_key_value(name)
        .map(|(key, def)| (key.as_str(), def))
}

/// Get all data source names (sorted)
pub fn all_data_source_names() -> Vec<&'static str> {
    get_registry()
        .data_sources
        .keys()
        .map(|s| s.as_str())
        .collect()
}
