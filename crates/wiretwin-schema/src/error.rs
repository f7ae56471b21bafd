//! Error types for schema parsing and validation.

/// Errors returned by the schema parsers and the validator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The schema uses a type that accepts anything and cannot be validated.
    #[error("forbidden type `{type_name}` in {record}.{field}")]
    ForbiddenType {
        record: String,
        field: String,
        type_name: String,
    },
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("unsupported schema format: {0}")]
    UnsupportedFormat(String),
}

impl SchemaError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        SchemaError::Syntax {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn forbidden(
        record: impl Into<String>,
        field: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        SchemaError::ForbiddenType {
            record: record.into(),
            field: field.into(),
            type_name: type_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_type_names_record_and_field() {
        let err = SchemaError::forbidden("User", "Extra", "interface{}");
        assert_eq!(err.to_string(), "forbidden type `interface{}` in User.Extra");
    }

    #[test]
    fn test_syntax_error_carries_position() {
        let err = SchemaError::syntax(14, "expected `(`");
        assert_eq!(err.to_string(), "syntax error at position 14: expected `(`");
    }
}
