//! Compiled schema validation with readable error messages.

use crate::error::SchemaError;
use crate::ir::Schema;
use crate::types::{Format, ValidationResult};
use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::{Draft, ValidationError};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// A schema compiled for Draft 2020-12 validation.
///
/// Immutable once built; share it behind an `Arc` to validate from several
/// threads.
#[derive(Debug)]
pub struct Validator {
    compiled: jsonschema::Validator,
    document: Value,
    warnings: Vec<String>,
}

impl Validator {
    /// Parse `text` in the given format and compile it.
    ///
    /// JSON Schema text is compiled as written, so keywords the schema IR
    /// does not model (`enum`, `minimum`, `pattern`, ...) still apply.
    pub fn new(text: &str, format: Format) -> Result<Self, SchemaError> {
        if format == Format::JsonSchema {
            let document: Value = serde_json::from_str(text)
                .map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
            return Self::compile(document, Vec::new());
        }
        let parsed = crate::parse(text, format)?;
        let document = to_document(&parsed.schema)?;
        Self::compile(document, parsed.warnings)
    }

    pub fn from_schema(schema: &Schema) -> Result<Self, SchemaError> {
        Self::compile(to_document(schema)?, Vec::new())
    }

    fn compile(document: Value, warnings: Vec<String>) -> Result<Self, SchemaError> {
        let compiled = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&document)
            .map_err(|e| SchemaError::InvalidSchema(e.to_string()))?;
        debug!("Compiled schema with {} warning(s)", warnings.len());

        Ok(Self {
            compiled,
            document,
            warnings,
        })
    }

    /// Parse warnings, e.g. record fields accepted as any value.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// The JSON Schema document that was compiled.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Validate raw JSON bytes.
    pub fn validate(&self, bytes: &[u8]) -> Result<ValidationResult, SchemaError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
        Ok(self.validate_value(&value))
    }

    pub fn validate_value(&self, value: &Value) -> ValidationResult {
        let mut seen = HashSet::new();
        let mut errors = Vec::new();

        for error in self.compiled.iter_errors(value) {
            collect_leaves(&error, &mut |line| {
                if seen.insert(line.clone()) {
                    errors.push(line);
                }
            });
        }

        if errors.is_empty() {
            ValidationResult::ok()
        } else {
            ValidationResult {
                valid: false,
                errors,
            }
        }
    }
}

fn to_document(schema: &Schema) -> Result<Value, SchemaError> {
    schema
        .to_value()
        .map_err(|e| SchemaError::InvalidSchema(e.to_string()))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Emit one `path: message` line per leaf error. `anyOf`/`oneOf` failures are
/// not leaves; their per-branch errors are walked instead.
fn collect_leaves(error: &ValidationError<'_>, emit: &mut dyn FnMut(String)) {
    match &error.kind {
        ValidationErrorKind::AnyOf { context } | ValidationErrorKind::OneOfNotValid { context }
            if !context.is_empty() =>
        {
            for branch in context {
                for cause in branch {
                    collect_leaves(cause, emit);
                }
            }
        }
        _ => {
            let path = error.instance_path.to_string();
            let path = if path.is_empty() { "/".to_string() } else { path };
            emit(format!("{path}: {}", describe(error)));
        }
    }
}

/// One-line message for a validation error that never echoes composite
/// instance data or schema internals.
fn describe(error: &ValidationError<'_>) -> String {
    let instance: &Value = &error.instance;
    match &error.kind {
        ValidationErrorKind::Required { property } => match property.as_str() {
            Some(name) => format!("missing required property `{name}`"),
            None => format!("missing required property {property}"),
        },
        ValidationErrorKind::AdditionalProperties { unexpected }
        | ValidationErrorKind::UnevaluatedProperties { unexpected } => {
            format!("unexpected properties: {}", unexpected.join(", "))
        }
        ValidationErrorKind::Type {
            kind: TypeKind::Single(expected),
        } => format!(
            "expected {}, got {}",
            format!("{expected:?}").to_lowercase(),
            json_type(instance)
        ),
        ValidationErrorKind::Type { .. } => {
            format!("value of type {} is not allowed", json_type(instance))
        }
        ValidationErrorKind::AnyOf { .. } | ValidationErrorKind::OneOfNotValid { .. } => {
            "value does not match any allowed schema".to_string()
        }
        ValidationErrorKind::OneOfMultipleValid { .. } => {
            "value matches more than one exclusive schema".to_string()
        }
        ValidationErrorKind::Enum { .. } => "value is not one of the allowed values".to_string(),
        ValidationErrorKind::Constant { .. } => {
            "value does not equal the expected constant".to_string()
        }
        ValidationErrorKind::FalseSchema { .. } => "no value is allowed here".to_string(),
        _ if instance.is_array() || instance.is_object() => {
            let schema_path = error.schema_path.to_string();
            let keyword = schema_path.rsplit('/').next().unwrap_or_default();
            format!("{} violates `{keyword}`", json_type(instance))
        }
        _ => error.to_string(),
    }
}
