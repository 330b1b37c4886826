use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Kind, ResourceType, Trap};

/// Cloud Run service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudRunService {
    pub name: String,
    pub location: String,
}

impl Trap for CloudRunService {
    fn trap_id(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> Kind {
        Kind::Compute
    }

    fn resource_type(&self) -> ResourceType {
        ResourceType::CloudRunService
    }
}
