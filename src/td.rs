//! Thing Description data model
//!
//! Serde representation of a W3C WoT Thing Description, covering the
//! fields the bridge interprets: identity, human-readable metadata, and
//! the three affordance maps with their forms. Everything else (JSON-LD
//! context, security definitions, vendor extensions, additional schema
//! keywords) is carried opaquely via `#[serde(flatten)]` so a consumed
//! TD round-trips for introspection.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A Thing Description document.
///
/// Minimum required content for the bridge is `title` or `id`; the
/// affordance maps are all optional and default to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThingDescription {
    /// Thing identifier (typically a URN or URL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human-readable title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Property affordances by name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyAffordance>,

    /// Action affordances by name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: BTreeMap<String, ActionAffordance>,

    /// Event affordances by name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub events: BTreeMap<String, EventAffordance>,

    /// Remaining TD members (`@context`, `securityDefinitions`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ThingDescription {
    /// Parse a TD from a JSON value
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Serialize the TD back to a JSON value
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// A property affordance: a named value the thing exposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyAffordance {
    /// Human-readable title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Value type from the data schema (`number`, `boolean`, ...)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,

    /// Whether the property rejects writes
    #[serde(rename = "readOnly")]
    pub read_only: bool,

    /// Whether the thing can push value changes
    pub observable: bool,

    /// Transport binding descriptors
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<Form>,

    /// Remaining data-schema keywords (`unit`, `minimum`, `enum`, ...)
    #[serde(flatten)]
    pub schema_extra: Map<String, Value>,
}

impl PropertyAffordance {
    /// Reassemble the property's value schema as a JSON Schema fragment.
    pub fn value_schema(&self) -> Value {
        let mut schema = Map::new();
        if let Some(ref t) = self.data_type {
            schema.insert("type".to_string(), Value::String(t.clone()));
        }
        for (k, v) in &self.schema_extra {
            schema.insert(k.clone(), v.clone());
        }
        Value::Object(schema)
    }
}

/// An action affordance: a named operation the thing performs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionAffordance {
    /// Human-readable title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Input data schema, carried opaquely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,

    /// Output data schema, carried opaquely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    /// Transport binding descriptors
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<Form>,

    /// Remaining affordance members
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An event affordance: a named notification stream the thing emits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventAffordance {
    /// Human-readable title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Event payload data schema, carried opaquely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Transport binding descriptors
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<Form>,

    /// Remaining affordance members
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A form: the binding descriptor for performing one interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Form {
    /// Target URL of the interaction
    pub href: String,

    /// Content type of the exchanged representation
    #[serde(rename = "contentType", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Operation type(s) this form serves (`readproperty`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<OpValue>,

    /// HTTP method override from the HTTP binding vocabulary
    #[serde(rename = "htv:methodName", skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,

    /// Remaining form members
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Form {
    /// URI scheme of the form's target, lowercased (`http`, `coap`, ...)
    pub fn scheme(&self) -> Option<String> {
        url::Url::parse(&self.href)
            .ok()
            .map(|u| u.scheme().to_string())
    }

    /// Whether this form serves the given operation type.
    ///
    /// A form without an `op` member serves any operation (the TD default).
    pub fn serves(&self, op: &str) -> bool {
        match &self.op {
            None => true,
            Some(v) => v.contains(op),
        }
    }
}

/// A form's `op` member: a single operation type or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpValue {
    /// A single operation type
    One(String),
    /// Several operation types
    Many(Vec<String>),
}

impl OpValue {
    /// Whether the given operation type is listed
    pub fn contains(&self, op: &str) -> bool {
        match self {
            OpValue::One(s) => s == op,
            OpValue::Many(v) => v.iter().any(|s| s == op),
        }
    }
}
