use std::error::Error as StdError;

use thiserror::Error;

use crate::binding::Phase;

/// Error type for schema lookups and declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("property `{0}` is not declared")]
    Undeclared(String),
    #[error("property names must not be empty")]
    EmptyName,
    #[error("property `{0}` has no nested schema")]
    NotNested(String),
}

/// Error type for render and parse calls.
///
/// Errors raised by a binding or by a nested call surface unchanged to the
/// caller of the outermost call. The engine never wraps them with property
/// context.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("value conversion failed: {0}")]
    Value(#[from] serde_json::Error),
    #[error("`{operation}` is not available during {phase}")]
    Phase {
        operation: &'static str,
        phase: Phase,
    },
    #[error("unexpected document shape: {0}")]
    Document(String),
    #[error("option evaluation failed: {0}")]
    Evaluation(String),
    #[error(transparent)]
    Custom(Box<dyn StdError + Send + Sync>),
}

impl MappingError {
    /// Wraps an arbitrary error raised by a binding or a represented object.
    pub fn custom(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        MappingError::Custom(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_converts() {
        let err: MappingError = SchemaError::Undeclared("title".into()).into();
        assert!(matches!(err, MappingError::Schema(SchemaError::Undeclared(ref n)) if n == "title"));
        assert_eq!(err.to_string(), "property `title` is not declared");
    }

    #[test]
    fn custom_keeps_message() {
        let err = MappingError::custom("boom");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn phase_message() {
        let err = MappingError::Phase {
            operation: "document_mut",
            phase: Phase::Uncompile,
        };
        assert_eq!(err.to_string(), "`document_mut` is not available during uncompile");
    }
}
