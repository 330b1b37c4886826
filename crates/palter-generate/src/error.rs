use thiserror::Error;

use crate::shape::SchemaViolation;

/// Errors raised by a constrained generation backend.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Model backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Model returned no candidates")]
    EmptyResponse,

    #[error("Model client config error: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Unsupported shape at {path}: {reason}")]
    UnsupportedShape { path: String, reason: String },

    #[error("Generation call {index} failed: {source}")]
    Model {
        index: usize,
        #[source]
        source: ModelError,
    },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Model response does not match schema: {0}")]
    SchemaMismatch(#[from] SchemaViolation),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Generation cancelled")]
    Cancelled,
}

impl GenerateError {
    pub(crate) fn unsupported(path: &str, reason: impl Into<String>) -> Self {
        GenerateError::UnsupportedShape {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
