//! Schema intermediate representation.
//!
//! A plain tree that serializes to a JSON Schema (Draft 2020-12) document.
//! Cross-record references use `$ref` strings into the root's `$defs` map, so
//! the tree never contains cycles.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Null,
    Object,
    Array,
}

impl SchemaType {
    pub fn name(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Boolean => "boolean",
            SchemaType::Null => "null",
            SchemaType::Object => "object",
            SchemaType::Array => "array",
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, SchemaType::Object | SchemaType::Array)
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `additionalProperties`: either a flag or a schema for the extra values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<Schema>),
}

/// One node of the schema tree.
///
/// The default value has no constraints at all (the "any" schema).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(
        rename = "additionalProperties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(rename = "anyOf", default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "$defs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, Schema>,
}

impl Schema {
    /// The unconstrained schema.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn of(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Default::default()
        }
    }

    pub fn object(properties: BTreeMap<String, Schema>, required: Vec<String>) -> Self {
        Self {
            schema_type: Some(SchemaType::Object),
            properties: Some(properties),
            required,
            ..Default::default()
        }
    }

    pub fn array(items: Schema) -> Self {
        Self {
            schema_type: Some(SchemaType::Array),
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    /// Object whose values all follow `values`; no named properties.
    pub fn map(values: Schema) -> Self {
        let additional = if values.is_any() {
            AdditionalProperties::Allowed(true)
        } else {
            AdditionalProperties::Schema(Box::new(values))
        };
        Self {
            additional_properties: Some(additional),
            ..Self::object(BTreeMap::new(), Vec::new())
        }
    }

    pub fn reference(target: impl Into<String>) -> Self {
        Self {
            reference: Some(target.into()),
            ..Default::default()
        }
    }

    pub fn any_of(variants: Vec<Schema>) -> Self {
        Self {
            any_of: variants,
            ..Default::default()
        }
    }

    /// Allow `null` in addition to whatever `inner` accepts.
    pub fn nullable(inner: Schema) -> Self {
        if inner.is_any() || inner.accepts_null() {
            return inner;
        }
        Self::any_of(vec![inner, Self::of(SchemaType::Null)])
    }

    pub fn is_any(&self) -> bool {
        *self == Self::default()
    }

    /// Whether this node admits `null` at its top level.
    pub fn accepts_null(&self) -> bool {
        self.schema_type == Some(SchemaType::Null)
            || self
                .any_of
                .iter()
                .any(|s| s.schema_type == Some(SchemaType::Null))
    }

    /// Short label: the type name, `a|b` for unions, `$ref` or `any`.
    pub fn type_label(&self) -> String {
        if let Some(t) = self.schema_type {
            return t.name().to_string();
        }
        if !self.any_of.is_empty() {
            return self
                .any_of
                .iter()
                .map(Schema::type_label)
                .collect::<Vec<_>>()
                .join("|");
        }
        if self.reference.is_some() {
            return "$ref".to_string();
        }
        "any".to_string()
    }

    /// Resolve a `$ref` of the form `#` or `#/$defs/Name` against `root`.
    pub fn resolve<'a>(&'a self, root: &'a Schema) -> Option<&'a Schema> {
        match self.reference.as_deref() {
            None => Some(self),
            Some("#") => Some(root),
            Some(target) => target
                .strip_prefix("#/$defs/")
                .and_then(|name| root.definitions.get(name)),
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
