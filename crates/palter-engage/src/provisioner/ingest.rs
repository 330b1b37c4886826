use std::collections::{BTreeMap, HashSet};

use palter_core::{Bucket, ResourceGraph, ResourceType, ServiceAccount, User};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{ProvisionerError, StateRecord};
use crate::error::EngageError;

pub const BUCKET_TYPE: &str = "gcp:storage/bucket:Bucket";
pub const SERVICE_ACCOUNT_TYPE: &str = "gcp:serviceaccount/account:Account";
pub const IAM_MEMBER_TYPE: &str = "gcp:serviceaccount/iAMMember:IAMMember";

const SERVICE_ACCOUNT_PREFIX: &str = "serviceAccount:";
const USER_PREFIX: &str = "user:";

/// What an ingestion pass added to the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub added: BTreeMap<ResourceType, usize>,
    /// Records with an unrecognized tag or principal.
    pub skipped: usize,
    /// Repeated bindings of a user that was already added.
    pub collapsed: usize,
}

impl IngestSummary {
    pub fn total_added(&self) -> usize {
        self.added.values().sum()
    }

    fn added(&mut self, resource_type: ResourceType) {
        *self.added.entry(resource_type).or_default() += 1;
    }
}

/// Map exported state records to target resources in `graph`.
///
/// A user bound in several IAM members is added once. Any other identity
/// collision is an error.
pub fn ingest(
    graph: &mut ResourceGraph,
    records: &[StateRecord],
) -> Result<IngestSummary, EngageError> {
    let mut summary = IngestSummary::default();
    let mut seen_users = HashSet::new();

    for record in records {
        match record.resource_type.as_str() {
            BUCKET_TYPE => {
                let bucket = Bucket {
                    name: record.require("name")?.to_string(),
                    location: record.require("location")?.to_string(),
                    storage_class: record.require("storageClass")?.to_string(),
                };
                graph.add(bucket)?;
                summary.added(ResourceType::Bucket);
            }
            SERVICE_ACCOUNT_TYPE => {
                let member = record.require("member")?;
                if !member.starts_with(SERVICE_ACCOUNT_PREFIX) {
                    warn!(urn = %record.urn, member, "skipping account that is not a service account");
                    summary.skipped += 1;
                    continue;
                }
                let account = ServiceAccount {
                    id: record.require("accountId")?.to_string(),
                    name: record.require("displayName")?.to_string(),
                    description: record.output("description").unwrap_or_default().to_string(),
                    email: record.require("email")?.to_string(),
                };
                graph.add(account)?;
                summary.added(ResourceType::ServiceAccount);
            }
            IAM_MEMBER_TYPE => {
                let member = record.require("member")?;
                let Some(email) = member.strip_prefix(USER_PREFIX) else {
                    debug!(urn = %record.urn, member, "skipping non-user binding");
                    summary.skipped += 1;
                    continue;
                };
                if email.is_empty() {
                    return Err(ProvisionerError::MalformedState {
                        urn: record.urn.clone(),
                        reason: "user member has no email".to_string(),
                    }
                    .into());
                }
                if !seen_users.insert(email.to_string()) {
                    summary.collapsed += 1;
                    continue;
                }
                graph.add(User {
                    name: String::new(),
                    email: email.to_string(),
                })?;
                summary.added(ResourceType::User);
            }
            other => {
                debug!(urn = %record.urn, resource_type = other, "skipping unrecognized record");
                summary.skipped += 1;
            }
        }
    }

    info!(
        added = summary.total_added(),
        skipped = summary.skipped,
        collapsed = summary.collapsed,
        "ingested stack state"
    );
    Ok(summary)
}
