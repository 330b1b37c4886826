//! Resource model and trap graph for Paltergeist.
//!
//! A [`ResourceGraph`] holds real resources sampled from live infrastructure
//! ("targets") next to generated decoys ("traps") in one identity namespace.

pub mod config;
pub mod error;
pub mod graph;
pub mod model;

pub use config::EngagementSettings;
pub use error::CoreError;
pub use graph::{is_target, is_trap, Entry, GraphSummary, Predicate, ResourceGraph};
pub use model::{
    Bucket, CloudRunService, Kind, Resource, ResourceType, RoleBinding, ServiceAccount, Trap,
    User, Variant,
};
