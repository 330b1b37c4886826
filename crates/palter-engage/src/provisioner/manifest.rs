//! The concrete cloud resources an engagement deploys.

use palter_core::{is_target, Resource, ResourceGraph, RoleBinding, ServiceAccount, Trap, User};
use serde::Serialize;
use tracing::{debug, warn};

pub const SERVICE_ACCOUNT_USER_ROLE: &str = "roles/iam.serviceAccountUser";
pub const TOKEN_CREATOR_ROLE: &str = "roles/iam.serviceAccountTokenCreator";
pub const LOG_WRITER_ROLE: &str = "roles/logging.logWriter";

pub const PRINCIPAL_SINK: &str = "paltergeist-trap-sink";
pub const BUCKET_SINK: &str = "paltergeist-trap-bucket-sink";

static GRANTED_ROLES: [&str; 2] = [SERVICE_ACCOUNT_USER_ROLE, TOKEN_CREATOR_ROLE];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSpec {
    pub name: String,
    pub location: String,
    pub storage_class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountSpec {
    pub account_id: String,
    pub display_name: String,
    pub description: String,
    pub email: String,
}

/// A role on a decoy service account granted to a real principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    /// Account id of the decoy service account the role is granted on.
    pub service_account: String,
    pub binding: RoleBinding,
}

/// An audit-log sink routing decoy interactions to the monitoring project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkSpec {
    pub name: String,
    pub destination: String,
    pub filter: String,
    /// Role given to the sink's writer identity on the monitoring project.
    pub writer_role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentManifest {
    pub project_id: String,
    pub monitoring_project_id: String,
    pub buckets: Vec<BucketSpec>,
    pub service_accounts: Vec<ServiceAccountSpec>,
    pub grants: Vec<Grant>,
    pub sinks: Vec<SinkSpec>,
}

/// Deterministic email of a service account created in `project_id`.
pub fn service_account_email(account_id: &str, project_id: &str) -> String {
    format!("{account_id}@{project_id}.iam.gserviceaccount.com")
}

impl DeploymentManifest {
    /// Compute the manifest for every decoy in `graph`.
    ///
    /// Decoys are deployed into `project_id`; audit logs about them are
    /// routed to `monitoring_project_id`.
    pub fn from_graph(graph: &ResourceGraph, project_id: &str, monitoring_project_id: &str) -> Self {
        let mut buckets = Vec::new();
        let mut service_accounts = Vec::new();

        for trap in graph.traps() {
            match trap {
                Resource::Bucket(bucket) => buckets.push(BucketSpec {
                    name: bucket.name.clone(),
                    location: bucket.location.clone(),
                    storage_class: bucket.storage_class.clone(),
                }),
                Resource::ServiceAccount(account) => service_accounts.push(ServiceAccountSpec {
                    account_id: account.id.clone(),
                    display_name: account.name.clone(),
                    description: account.description.clone(),
                    email: service_account_email(&account.id, project_id),
                }),
                other => {
                    warn!(id = other.trap_id(), resource_type = %other.resource_type(), "no deployment for trap type")
                }
            }
        }

        let principals = target_principals(graph);
        let grants: Vec<Grant> = service_accounts
            .iter()
            .flat_map(|account| {
                principals.iter().flat_map(move |principal| {
                    GRANTED_ROLES.iter().map(move |role| Grant {
                        service_account: account.account_id.clone(),
                        binding: RoleBinding::new(principal.clone(), *role),
                    })
                })
            })
            .collect();

        let destination = format!("logging.googleapis.com/projects/{monitoring_project_id}");
        let mut sinks = Vec::new();

        let emails: Vec<&str> = service_accounts.iter().map(|a| a.email.as_str()).collect();
        if let Some(pattern) = alternation(&emails) {
            sinks.push(SinkSpec {
                name: PRINCIPAL_SINK.to_string(),
                destination: destination.clone(),
                filter: format!(
                    "protoPayload.authenticationInfo.principalEmail =~ \"{pattern}\" OR resource.labels.email_id =~ \"{pattern}\""
                ),
                writer_role: LOG_WRITER_ROLE.to_string(),
            });
        }

        let names: Vec<&str> = buckets.iter().map(|b| b.name.as_str()).collect();
        if let Some(pattern) = alternation(&names) {
            sinks.push(SinkSpec {
                name: BUCKET_SINK.to_string(),
                destination,
                filter: format!("protoPayload.resourceName =~ \"{pattern}\""),
                writer_role: LOG_WRITER_ROLE.to_string(),
            });
        }

        debug!(
            buckets = buckets.len(),
            service_accounts = service_accounts.len(),
            grants = grants.len(),
            sinks = sinks.len(),
            "computed deployment manifest"
        );

        Self {
            project_id: project_id.to_string(),
            monitoring_project_id: monitoring_project_id.to_string(),
            buckets,
            service_accounts,
            grants,
            sinks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty() && self.service_accounts.is_empty()
    }
}

/// Members of every target service account and user, in graph order.
fn target_principals(graph: &ResourceGraph) -> Vec<String> {
    let accounts = graph
        .select::<ServiceAccount>(&[is_target])
        .into_iter()
        .map(|account| format!("serviceAccount:{}", account.email));
    let users = graph
        .select::<User>(&[is_target])
        .into_iter()
        .map(|user| format!("user:{}", user.email));
    accounts.chain(users).collect()
}

/// `(a|b)` over the regex-escaped identifiers, or `None` when there are none.
fn alternation(identifiers: &[&str]) -> Option<String> {
    if identifiers.is_empty() {
        return None;
    }
    let escaped: Vec<String> = identifiers.iter().map(|id| regex::escape(id)).collect();
    Some(format!("({})", escaped.join("|")))
}
