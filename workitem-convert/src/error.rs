//! Error types for the conversion engine

use thiserror::Error;
use workitem_fields::FieldsError;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Errors raised while applying patches, projecting resources or exporting
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Malformed or disallowed input value
    #[error("bad parameter '{parameter}': {value}")]
    BadParameter { parameter: String, value: String },

    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Structurally inconsistent data
    #[error("internal error: {message}")]
    Internal { message: String },

    /// Field value conversion failed
    #[error(transparent)]
    Field(#[from] FieldsError),

    /// A lower-level error annotated with the field key or entity it concerns
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ConvertError>,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,
}

impl ConvertError {
    /// Create a bad parameter error
    pub fn bad_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::BadParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Wrap this error with the field key or entity id it concerns
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, seen through any context wrapping
    pub fn root(&self) -> &ConvertError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_bad_parameter(&self) -> bool {
        matches!(self.root(), Self::BadParameter { .. } | Self::Field(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound { .. })
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.root(), Self::Internal { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }
}

/// Attach context to the error of a fallible result
pub trait ResultExt<T> {
    fn context(self, context: impl FnOnce() -> String) -> Result<T>;
}

impl<T, E: Into<ConvertError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|e| e.into().with_context(context()))
    }
}
