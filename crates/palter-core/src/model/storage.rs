use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Kind, ResourceType, Trap};

/// Cloud Storage bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Globally unique bucket name.
    pub name: String,
    /// Region or multi-region the bucket lives in.
    pub location: String,
    /// Default storage class of objects in the bucket.
    pub storage_class: String,
}

impl Trap for Bucket {
    fn trap_id(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> Kind {
        Kind::Storage
    }

    fn resource_type(&self) -> ResourceType {
        ResourceType::Bucket
    }
}
