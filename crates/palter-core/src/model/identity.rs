use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Kind, ResourceType, Trap};

/// A human IAM account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Display name of the user.
    pub name: String,
    /// Email address that uniquely identifies the user.
    pub email: String,
}

impl Trap for User {
    fn trap_id(&self) -> &str {
        &self.email
    }

    fn kind(&self) -> Kind {
        Kind::Identity
    }

    fn resource_type(&self) -> ResourceType {
        ResourceType::User
    }
}

/// A non-human IAM account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    /// The account id that uniquely identifies the service account, e.g. `api-backend-sa`.
    pub id: String,
    /// Friendly display name of the service account.
    pub name: String,
    /// Brief explanation of the purpose or workload of the service account.
    pub description: String,
    /// Email address of the service account.
    pub email: String,
}

impl Trap for ServiceAccount {
    fn trap_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> Kind {
        Kind::Identity
    }

    fn resource_type(&self) -> ResourceType {
        ResourceType::ServiceAccount
    }
}

/// A role granted to a principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBinding {
    /// IAM member string of the principal, e.g. `user:alice@example.com`.
    pub principal_id: String,
    /// Role granted to the principal.
    pub role: String,
}

impl RoleBinding {
    pub fn new(principal_id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            role: role.into(),
        }
    }
}
