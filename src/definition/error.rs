//! Definition error types.

use thiserror::Error;

/// Errors that can occur while reading or writing a machine definition.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// The document is not valid JSON or does not match the definition shape.
    #[error("Failed to parse machine definition: {0}")]
    Parse(#[source] serde_json::Error),

    /// The definition could not be rendered as JSON.
    #[error("Failed to serialize machine definition: {0}")]
    Serialize(#[source] serde_json::Error),
}
