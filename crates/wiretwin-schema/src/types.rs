//! Core types shared by the parsers, inference and the validator.

use crate::error::SchemaError;
use crate::ir::Schema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Surface syntax of a schema text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    /// `type Name struct { ... }` definitions with `json:"..."` tags.
    RecordType,
    /// Chained `z.object({...})` builder calls.
    FluentDsl,
    /// A JSON Schema document.
    JsonSchema,
}

impl Format {
    pub fn label(&self) -> &'static str {
        match self {
            Format::RecordType => "record-type",
            Format::FluentDsl => "fluent-dsl",
            Format::JsonSchema => "json-schema",
        }
    }

    /// Guess the format of a schema file from its extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str())? {
            "go" => Some(Format::RecordType),
            "ts" | "js" | "mjs" => Some(Format::FluentDsl),
            "json" => Some(Format::JsonSchema),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Format {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record-type" | "record" => Ok(Format::RecordType),
            "fluent-dsl" | "fluent" => Ok(Format::FluentDsl),
            "json-schema" | "jsonschema" | "json" => Ok(Format::JsonSchema),
            other => Err(SchemaError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// A parsed schema plus the non-fatal warnings collected on the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedSchema {
    pub schema: Schema,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Outcome of validating one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// `"/instance/path: message"` strings, deduplicated.
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferOptions {
    /// Compute `required` from key presence across samples.
    pub strict_required: bool,
    /// With `strict_required`, keys that are `null` in some sample are optional.
    pub mark_nullable_as_optional: bool,
    /// Stamp `additionalProperties` on every inferred object.
    pub additional_properties: Option<bool>,
}

impl Default for InferOptions {
    fn default() -> Self {
        Self {
            strict_required: true,
            mark_nullable_as_optional: false,
            additional_properties: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferResult {
    pub schema: Schema,
    pub sample_count: usize,
    /// Every parsed sample produced exactly the same schema.
    pub all_match: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("record-type".parse::<Format>().unwrap(), Format::RecordType);
        assert_eq!("Fluent-DSL".parse::<Format>().unwrap(), Format::FluentDsl);
        assert_eq!("json".parse::<Format>().unwrap(), Format::JsonSchema);
        assert!(matches!(
            "protobuf".parse::<Format>(),
            Err(SchemaError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            Format::from_extension(Path::new("schemas/user.go")),
            Some(Format::RecordType)
        );
        assert_eq!(
            Format::from_extension(Path::new("user.ts")),
            Some(Format::FluentDsl)
        );
        assert_eq!(
            Format::from_extension(Path::new("user.json")),
            Some(Format::JsonSchema)
        );
        assert_eq!(Format::from_extension(Path::new("user.txt")), None);
        assert_eq!(Format::from_extension(Path::new("Makefile")), None);
    }

    #[test]
    fn test_format_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Format::FluentDsl).unwrap(),
            "\"fluent-dsl\""
        );
    }

    #[test]
    fn test_infer_options_defaults() {
        let opts: InferOptions = serde_json::from_str("{}").unwrap();
        assert!(opts.strict_required);
        assert!(!opts.mark_nullable_as_optional);
        assert!(opts.additional_properties.is_none());
    }
}
