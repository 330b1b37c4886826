use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Bucket, CloudRunService, ServiceAccount, User};

/// Coarse category of a resource, used to group related traps together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Storage,
    Compute,
    Network,
    Database,
    Secrets,
    Container,
    Identity,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Storage => "storage",
            Kind::Compute => "compute",
            Kind::Network => "network",
            Kind::Database => "database",
            Kind::Secrets => "secrets",
            Kind::Container => "container",
            Kind::Identity => "identity",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fine-grained type of a resource, maps to one concrete cloud resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    ServiceAccount,
    User,
    Bucket,
    CloudRunService,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::ServiceAccount => "service_account",
            ResourceType::User => "user",
            ResourceType::Bucket => "bucket",
            ResourceType::CloudRunService => "cloud_run_service",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities shared by every resource that can live in the graph.
pub trait Trap {
    /// Unique identifier of the resource within the graph namespace.
    fn trap_id(&self) -> &str;
    /// Category used to group related resources.
    fn kind(&self) -> Kind;
    /// Concrete resource type, used for dispatch.
    fn resource_type(&self) -> ResourceType;
}

/// Any resource known to the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resource {
    User(User),
    ServiceAccount(ServiceAccount),
    Bucket(Bucket),
    CloudRunService(CloudRunService),
}

impl Resource {
    fn as_trap(&self) -> &dyn Trap {
        match self {
            Resource::User(r) => r,
            Resource::ServiceAccount(r) => r,
            Resource::Bucket(r) => r,
            Resource::CloudRunService(r) => r,
        }
    }
}

impl Trap for Resource {
    fn trap_id(&self) -> &str {
        self.as_trap().trap_id()
    }

    fn kind(&self) -> Kind {
        self.as_trap().kind()
    }

    fn resource_type(&self) -> ResourceType {
        self.as_trap().resource_type()
    }
}

/// A concrete resource variant that can be selected out of a [`Resource`].
pub trait Variant: Trap + Sized {
    fn from_resource(resource: &Resource) -> Option<&Self>;
    fn into_resource(self) -> Resource;
}

macro_rules! impl_variant {
    ($ty:ident) => {
        impl Variant for $ty {
            fn from_resource(resource: &Resource) -> Option<&Self> {
                match resource {
                    Resource::$ty(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_resource(self) -> Resource {
                Resource::$ty(self)
            }
        }

        impl From<$ty> for Resource {
            fn from(value: $ty) -> Self {
                Resource::$ty(value)
            }
        }
    };
}

impl_variant!(User);
impl_variant!(ServiceAccount);
impl_variant!(Bucket);
impl_variant!(CloudRunService);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_delegates_capabilities() {
        let bucket: Resource = Bucket {
            name: "nomaladies-data".into(),
            location: "us-central1".into(),
            storage_class: "STANDARD".into(),
        }
        .into();
        assert_eq!(bucket.trap_id(), "nomaladies-data");
        assert_eq!(bucket.kind(), Kind::Storage);
        assert_eq!(bucket.resource_type(), ResourceType::Bucket);

        let user: Resource = User {
            name: "Alice".into(),
            email: "alice@example.com".into(),
        }
        .into();
        assert_eq!(user.trap_id(), "alice@example.com");
        assert_eq!(user.kind(), Kind::Identity);
    }

    #[test]
    fn test_variant_downcast() {
        let resource = ServiceAccount {
            id: "api-service-sa".into(),
            ..Default::default()
        }
        .into_resource();
        assert!(ServiceAccount::from_resource(&resource).is_some());
        assert!(Bucket::from_resource(&resource).is_none());
        assert!(User::from_resource(&resource).is_none());
    }

    #[test]
    fn test_resource_serde_tagged() {
        let resource = Resource::Bucket(Bucket {
            name: "data".into(),
            location: "us-central1".into(),
            storage_class: "STANDARD".into(),
        });
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["type"], "bucket");
        assert_eq!(json["storageClass"], "STANDARD");
        let parsed: Resource = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, resource);
    }
}
