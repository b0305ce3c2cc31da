//! Error types for the field type system

use thiserror::Error;

/// Result type for field operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors that can occur while converting field values
#[derive(Debug, Error)]
pub enum FieldsError {
    /// The runtime shape of a value does not match the declared kind
    #[error("bad value for field '{field}' of kind {kind}: {message}")]
    BadValue {
        field: String,
        kind: String,
        message: String,
    },

    /// Field not declared by the work item type
    #[error("field not found: {name}")]
    FieldNotFound { name: String },

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl FieldsError {
    /// Create a bad value error
    pub fn bad_value(
        field: impl Into<String>,
        kind: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self::BadValue {
            field: field.into(),
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FieldsError::FieldNotFound {
            name: "system.title".into(),
        };
        assert_eq!(err.to_string(), "field not found: system.title");
    }

    #[test]
    fn test_bad_value_names_field_and_kind() {
        let err = FieldsError::bad_value("points", "integer", "expected a number");
        assert!(err.to_string().contains("points"));
        assert!(err.to_string().contains("integer"));
        assert!(err.to_string().contains("expected a number"));
    }
}
