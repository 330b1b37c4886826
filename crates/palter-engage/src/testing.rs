//! Fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use palter_core::{Bucket, Resource, ResourceGraph, ServiceAccount};
use palter_generate::{ConstrainedModel, GenerateError, ModelError, ResponseSchema};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::error::EngageError;
use crate::provisioner::ingest::{BUCKET_TYPE, SERVICE_ACCOUNT_TYPE};
use crate::provisioner::{Provisioner, ProvisionerError, StateRecord};
use crate::stratagem::Stratagem;

pub fn service_account(id: &str) -> ServiceAccount {
    ServiceAccount {
        id: id.to_string(),
        name: format!("{id} runtime"),
        description: String::new(),
        email: format!("{id}@acme-prod.iam.gserviceaccount.com"),
    }
}

pub fn bucket(name: &str, location: &str, storage_class: &str) -> Bucket {
    Bucket {
        name: name.to_string(),
        location: location.to_string(),
        storage_class: storage_class.to_string(),
    }
}

/// Replays canned JSON responses in call order.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn accounts(ids: &[&str]) -> Arc<Self> {
        Self::new(
            ids.iter()
                .map(|id| serde_json::to_string(&service_account(id)).unwrap())
                .collect(),
        )
    }

    pub fn buckets(buckets: &[(&str, &str, &str)]) -> Arc<Self> {
        Self::new(
            buckets
                .iter()
                .map(|(name, location, class)| {
                    serde_json::to_string(&bucket(name, location, class)).unwrap()
                })
                .collect(),
        )
    }

    /// Remove and return the responses not served yet.
    pub fn drain(&self) -> Vec<String> {
        self.responses.lock().unwrap().drain(..).collect()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConstrainedModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_constrained(
        &self,
        prompt: &str,
        _schema: &ResponseSchema,
    ) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ModelError::EmptyResponse)
    }
}

/// Serves fixed stack exports and records every apply and destroy.
#[derive(Default)]
pub struct FakeProvisioner {
    records: Vec<StateRecord>,
    exports: AtomicUsize,
    applied: Mutex<Vec<(String, usize)>>,
    destroyed: Mutex<Vec<String>>,
}

impl FakeProvisioner {
    pub fn with_targets(targets: &[Resource]) -> Arc<Self> {
        let records = targets
            .iter()
            .map(|resource| match resource {
                Resource::ServiceAccount(account) => StateRecord {
                    urn: format!("urn:pulumi:prod::app::{SERVICE_ACCOUNT_TYPE}::{}", account.id),
                    resource_type: SERVICE_ACCOUNT_TYPE.to_string(),
                    outputs: json!({
                        "accountId": account.id,
                        "displayName": account.name,
                        "email": account.email,
                        "member": format!("serviceAccount:{}", account.email),
                    })
                    .as_object()
                    .cloned()
                    .unwrap(),
                },
                Resource::Bucket(bucket) => StateRecord {
                    urn: format!("urn:pulumi:prod::app::{BUCKET_TYPE}::{}", bucket.name),
                    resource_type: BUCKET_TYPE.to_string(),
                    outputs: json!({
                        "name": bucket.name,
                        "location": bucket.location,
                        "storageClass": bucket.storage_class,
                    })
                    .as_object()
                    .cloned()
                    .unwrap(),
                },
                other => panic!("no fake state for {other:?}"),
            })
            .collect();
        Arc::new(Self {
            records,
            ..Self::default()
        })
    }

    pub fn exports(&self) -> usize {
        self.exports.load(Ordering::SeqCst)
    }

    /// `(engagement, trap count)` of every apply.
    pub fn applied(&self) -> Vec<(String, usize)> {
        self.applied.lock().unwrap().clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provisioner for FakeProvisioner {
    async fn export_state(
        &self,
        cancel: &CancellationToken,
        _stack: &str,
    ) -> Result<Vec<StateRecord>, ProvisionerError> {
        if cancel.is_cancelled() {
            return Err(ProvisionerError::Cancelled);
        }
        self.exports.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }

    async fn apply(
        &self,
        _cancel: &CancellationToken,
        engagement: &str,
        graph: &ResourceGraph,
    ) -> Result<(), ProvisionerError> {
        self.applied
            .lock()
            .unwrap()
            .push((engagement.to_string(), graph.traps().len()));
        Ok(())
    }

    async fn destroy(
        &self,
        _cancel: &CancellationToken,
        engagement: &str,
    ) -> Result<(), ProvisionerError> {
        self.destroyed.lock().unwrap().push(engagement.to_string());
        Ok(())
    }
}

/// Adds a fixed decoy, or fails with a generation error.
pub struct FixedStratagem {
    pub name: &'static str,
    pub decoy: Option<ServiceAccount>,
}

#[async_trait]
impl Stratagem for FixedStratagem {
    fn name(&self) -> &str {
        self.name
    }

    async fn plan(
        &self,
        _cancel: &CancellationToken,
        graph: &mut ResourceGraph,
    ) -> Result<(), EngageError> {
        match &self.decoy {
            Some(decoy) => Ok(graph.add_trap(decoy.clone())?),
            None => Err(GenerateError::Model {
                index: 0,
                source: ModelError::Backend {
                    status: 503,
                    message: "model overloaded".into(),
                },
            }
            .into()),
        }
    }
}

/// Adds its decoy, then never finishes.
pub struct StalledStratagem {
    pub decoy: ServiceAccount,
}

#[async_trait]
impl Stratagem for StalledStratagem {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn plan(
        &self,
        _cancel: &CancellationToken,
        graph: &mut ResourceGraph,
    ) -> Result<(), EngageError> {
        graph.add_trap(self.decoy.clone())?;
        std::future::pending::<()>().await;
        Ok(())
    }
}
