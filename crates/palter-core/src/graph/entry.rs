use serde::Serialize;

use crate::model::{Resource, Trap};

/// A resource in the graph, marked as either a trap or a target.
///
/// The marker is fixed when the entry is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    decoy: bool,
    resource: Resource,
}

impl Entry {
    pub(crate) fn target(resource: Resource) -> Self {
        Self {
            decoy: false,
            resource,
        }
    }

    pub(crate) fn trap(resource: Resource) -> Self {
        Self {
            decoy: true,
            resource,
        }
    }

    /// Returns true if the entry is a generated decoy.
    pub fn is_trap(&self) -> bool {
        self.decoy
    }

    /// Identity of the underlying resource.
    pub fn id(&self) -> &str {
        self.resource.trap_id()
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub(crate) fn role(&self) -> &'static str {
        if self.decoy {
            "trap"
        } else {
            "target"
        }
    }
}

/// Filter applied to graph entries during selection.
pub type Predicate = fn(&Entry) -> bool;

/// Matches entries that are decoys.
pub fn is_trap(entry: &Entry) -> bool {
    entry.is_trap()
}

/// Matches entries that are real, sampled resources.
pub fn is_target(entry: &Entry) -> bool {
    !entry.is_trap()
}
