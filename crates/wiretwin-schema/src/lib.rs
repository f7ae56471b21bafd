//! Schema tooling for captured request and response bodies.
//!
//! Parses schemas written as record types, fluent-DSL chains or JSON Schema
//! into a common IR, infers schemas from sample documents, computes per-field
//! statistics and validates documents with readable errors. Everything here is
//! CPU-only and synchronous.
//!
//! # Example
//!
//! ```no_run
//! use wiretwin_schema::{infer, Format, InferOptions, Validator};
//!
//! let validator = Validator::new(
//!     "type User struct { ID int `json:\"id\"`; Email *string `json:\"email\"` }",
//!     Format::RecordType,
//! )?;
//! let result = validator.validate(br#"{"id": 1, "email": null}"#)?;
//! assert!(result.valid);
//!
//! let inferred = infer(&[br#"{"id": 1}"#], &InferOptions::default());
//! println!("{}", inferred.schema.to_json_pretty()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod fluent;
mod infer;
mod ir;
mod record;
mod stats;
mod types;
mod validator;

pub use error::SchemaError;
pub use ir::{AdditionalProperties, Schema, SchemaType};
pub use types::{Format, InferOptions, InferResult, ParsedSchema, ValidationResult};
pub use validator::Validator;

// Re-export the individual stages for advanced usage
pub use fluent::parse_fluent;
pub use infer::{infer, infer_from_values, infer_value, merge};
pub use record::parse_record_types;
pub use stats::{detect_format, field_stats, field_stats_for_values, FieldStat, DEFAULT_MAX_DEPTH};

/// Parse schema text in the given format into the IR.
pub fn parse(text: &str, format: Format) -> Result<ParsedSchema, SchemaError> {
    match format {
        Format::RecordType => parse_record_types(text),
        Format::FluentDsl => parse_fluent(text),
        Format::JsonSchema => parse_json_schema(text),
    }
}

fn parse_json_schema(text: &str) -> Result<ParsedSchema, SchemaError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
    let schema: Schema =
        serde_json::from_value(value).map_err(|e| SchemaError::InvalidSchema(e.to_string()))?;
    Ok(ParsedSchema {
        schema,
        warnings: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dispatches_by_format() {
        let record = parse("type T struct { A string }", Format::RecordType).unwrap();
        let fluent = parse("z.object({ a: z.string() })", Format::FluentDsl).unwrap();
        assert_eq!(record.schema, fluent.schema);

        let json = record.schema.to_json_pretty().unwrap();
        assert_eq!(parse(&json, Format::JsonSchema).unwrap().schema, record.schema);
    }

    #[test]
    fn test_json_schema_rejects_non_object_documents() {
        assert!(matches!(
            parse("[1, 2]", Format::JsonSchema),
            Err(SchemaError::InvalidSchema(_))
        ));
        assert!(matches!(
            parse("not json", Format::JsonSchema),
            Err(SchemaError::InvalidJson(_))
        ));
    }
}
