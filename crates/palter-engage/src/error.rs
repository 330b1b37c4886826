use std::fmt;

use palter_core::CoreError;
use palter_generate::{GenerateError, ModelError};
use thiserror::Error;

use crate::engagement::EngagementState;
use crate::provisioner::ProvisionerError;

/// Coarse classification of every failure an engagement can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DuplicateIdentity,
    UnsupportedShape,
    GenerationFailure,
    TransportFailure,
    ConfigurationError,
    Cancelled,
    InvalidState,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DuplicateIdentity => "duplicate_identity",
            ErrorKind::UnsupportedShape => "unsupported_shape",
            ErrorKind::GenerationFailure => "generation_failure",
            ErrorKind::TransportFailure => "transport_failure",
            ErrorKind::ConfigurationError => "configuration_error",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvalidState => "invalid_state",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum EngageError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Provisioner(#[from] ProvisionerError),

    #[error("Stratagem '{name}' failed: {source}")]
    Stratagem {
        name: String,
        #[source]
        source: Box<EngageError>,
    },

    #[error("Cannot {action} an engagement that is {state}")]
    InvalidState {
        action: &'static str,
        state: EngagementState,
    },

    #[error("Engagement cancelled")]
    Cancelled,
}

impl EngageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngageError::Core(CoreError::DuplicateIdentity { .. }) => ErrorKind::DuplicateIdentity,
            EngageError::Core(CoreError::Config(_)) => ErrorKind::ConfigurationError,
            EngageError::Generate(err) => match err {
                GenerateError::UnsupportedShape { .. } => ErrorKind::UnsupportedShape,
                GenerateError::Cancelled => ErrorKind::Cancelled,
                GenerateError::Model {
                    source: ModelError::Config(_),
                    ..
                } => ErrorKind::ConfigurationError,
                _ => ErrorKind::GenerationFailure,
            },
            EngageError::Provisioner(err) => match err {
                ProvisionerError::Cancelled => ErrorKind::Cancelled,
                ProvisionerError::Config(_) => ErrorKind::ConfigurationError,
                _ => ErrorKind::TransportFailure,
            },
            EngageError::Stratagem { source, .. } => source.kind(),
            EngageError::InvalidState { .. } => ErrorKind::InvalidState,
            EngageError::Cancelled => ErrorKind::Cancelled,
        }
    }
}
