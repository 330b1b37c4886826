//! Boundary to the infrastructure-as-code engine.

pub mod ingest;
pub mod manifest;
pub mod pulumi;

use async_trait::async_trait;
use palter_core::ResourceGraph;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {code}: {stderr}")]
    Command {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Malformed state record {urn}: {reason}")]
    MalformedState { urn: String, reason: String },

    #[error("Unsupported deployment version {0}")]
    UnsupportedState(i64),

    #[error("Invalid stack export: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Program resource name '{0}' is already taken")]
    DuplicateLogicalName(String),

    #[error("Failed to render program: {0}")]
    Render(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Provisioner config error: {0}")]
    Config(String),

    #[error("Provisioning cancelled")]
    Cancelled,
}

/// One resource from an exported stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub urn: String,
    /// Provider type tag, e.g. `gcp:storage/bucket:Bucket`.
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub outputs: Map<String, Value>,
}

impl StateRecord {
    /// String output `key`, if present.
    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).and_then(Value::as_str)
    }

    /// String output `key`, or a `MalformedState` error naming it.
    pub fn require(&self, key: &str) -> Result<&str, ProvisionerError> {
        self.output(key).ok_or_else(|| ProvisionerError::MalformedState {
            urn: self.urn.clone(),
            reason: format!("missing string output '{key}'"),
        })
    }
}

/// Reads live infrastructure and applies or tears down engagements.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Export every resource recorded in a fully qualified stack.
    async fn export_state(
        &self,
        cancel: &CancellationToken,
        stack: &str,
    ) -> Result<Vec<StateRecord>, ProvisionerError>;

    /// Create or update the decoys of `graph` under the engagement's name.
    async fn apply(
        &self,
        cancel: &CancellationToken,
        engagement: &str,
        graph: &ResourceGraph,
    ) -> Result<(), ProvisionerError>;

    /// Remove everything deployed under the engagement's name.
    async fn destroy(
        &self,
        cancel: &CancellationToken,
        engagement: &str,
    ) -> Result<(), ProvisionerError>;
}
