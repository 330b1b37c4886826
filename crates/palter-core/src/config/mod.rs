pub mod settings;

pub use settings::{EngagementSettings, DEFAULT_REGION, DEFAULT_STORAGE_CLASS};
