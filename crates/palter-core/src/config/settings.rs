use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const DEFAULT_REGION: &str = "us-central1";
pub const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

const STORAGE_CLASSES: &[&str] = &["STANDARD", "NEARLINE", "COLDLINE", "ARCHIVE"];

/// Settings for one engagement run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementSettings {
    /// Engagement name, also used as the deployment stack name.
    pub name: String,
    /// Fully qualified stacks to sample target resources from.
    pub target_stacks: Vec<String>,
    /// Project that receives the traps.
    pub target_project_id: String,
    /// Project that receives the audit log sinks.
    pub paltergeist_project_id: String,
    /// Region pinned on generated buckets.
    pub region: String,
    /// Storage class pinned on generated buckets.
    pub storage_class: String,
    pub service_account_traps: usize,
    pub bucket_traps: usize,
}

impl EngagementSettings {
    /// Settings with default region, storage class and trap counts.
    pub fn new(
        name: impl Into<String>,
        target_project_id: impl Into<String>,
        paltergeist_project_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_stacks: Vec::new(),
            target_project_id: target_project_id.into(),
            paltergeist_project_id: paltergeist_project_id.into(),
            region: DEFAULT_REGION.to_string(),
            storage_class: DEFAULT_STORAGE_CLASS.to_string(),
            service_account_traps: 3,
            bucket_traps: 1,
        }
    }

    pub fn with_target_stack(mut self, stack: impl Into<String>) -> Self {
        self.target_stacks.push(stack.into());
        self
    }

    /// Check that every required setting is present and well-formed.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.is_empty() {
            return Err(CoreError::Config("engagement name is required".into()));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(CoreError::Config(format!(
                "engagement name '{}' may only contain letters, digits, '-', '_' and '.'",
                self.name
            )));
        }
        if self.target_project_id.is_empty() {
            return Err(CoreError::Config("target project id is required".into()));
        }
        if self.paltergeist_project_id.is_empty() {
            return Err(CoreError::Config(
                "paltergeist project id is required".into(),
            ));
        }
        if self.target_stacks.is_empty() {
            return Err(CoreError::Config("at least one target stack is required".into()));
        }
        if self.target_stacks.iter().any(|s| s.trim().is_empty()) {
            return Err(CoreError::Config("target stack names must not be empty".into()));
        }
        if self.region.is_empty() {
            return Err(CoreError::Config("region is required".into()));
        }
        if !STORAGE_CLASSES.contains(&self.storage_class.as_str()) {
            return Err(CoreError::Config(format!(
                "unsupported storage class '{}' (expected one of {})",
                self.storage_class,
                STORAGE_CLASSES.join(", ")
            )));
        }
        Ok(())
    }
}
