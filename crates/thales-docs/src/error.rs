//! Error types for the documentation generation crate.

use thiserror::Error;

/// Errors that can occur during documentation generation.
#[derive(Debug, Error)]
pub enum DocsError {
    /// Failed to serialize the document to JSON.
    #[error("Failed to serialize OpenAPI document: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Failed to serialize the document to YAML.
    #[error("Failed to serialize OpenAPI document as YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Two different records are published under the same component name.
    #[error("Conflicting component schemas named '{name}'")]
    SchemaConflict {
        /// The component name.
        name: String,
    },

    /// A route cannot be expressed as an OpenAPI operation.
    #[error("Invalid operation '{operation_id}': {reason}")]
    InvalidOperation {
        /// The operation ID that is invalid.
        operation_id: String,
        /// The reason the operation is invalid.
        reason: String,
    },
}

/// Result type for documentation operations.
pub type DocsResult<T> = Result<T, DocsError>;
