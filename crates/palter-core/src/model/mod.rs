pub mod compute;
pub mod identity;
pub mod resource;
pub mod storage;

pub use compute::CloudRunService;
pub use identity::{RoleBinding, ServiceAccount, User};
pub use resource::{Kind, Resource, ResourceType, Trap, Variant};
pub use storage::Bucket;
