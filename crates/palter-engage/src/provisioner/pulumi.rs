//! Provisioner driving the `pulumi` CLI.
//!
//! Each engagement is a stack of a YAML program written under
//! `<work_dir>/<engagement>/Pulumi.yaml`. Target stacks are read with
//! `pulumi stack export`.

use std::collections::{btree_map, BTreeMap};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use palter_core::ResourceGraph;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::manifest::DeploymentManifest;
use super::{Provisioner, ProvisionerError, StateRecord};

pub const DEFAULT_BINARY: &str = "pulumi";
pub const PROJECT_NAME: &str = "paltergeist";
const PROGRAM_FILE: &str = "Pulumi.yaml";
const SUPPORTED_DEPLOYMENT_VERSION: i64 = 3;

#[derive(Debug, Clone)]
pub struct PulumiSettings {
    /// Path or name of the `pulumi` executable.
    pub binary: PathBuf,
    /// Directory holding one program directory per engagement.
    pub work_dir: PathBuf,
    /// Project that receives the decoys.
    pub project_id: String,
    /// Project that receives the audit log sinks.
    pub monitoring_project_id: String,
}

impl PulumiSettings {
    pub fn new(
        work_dir: impl Into<PathBuf>,
        project_id: impl Into<String>,
        monitoring_project_id: impl Into<String>,
    ) -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
            work_dir: work_dir.into(),
            project_id: project_id.into(),
            monitoring_project_id: monitoring_project_id.into(),
        }
    }
}

pub struct PulumiProvisioner {
    settings: PulumiSettings,
}

impl PulumiProvisioner {
    pub fn new(settings: PulumiSettings) -> Result<Self, ProvisionerError> {
        if settings.project_id.trim().is_empty() {
            return Err(ProvisionerError::Config("target project id is required".into()));
        }
        if settings.monitoring_project_id.trim().is_empty() {
            return Err(ProvisionerError::Config(
                "monitoring project id is required".into(),
            ));
        }
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &PulumiSettings {
        &self.settings
    }

    fn stack_dir(&self, engagement: &str) -> Result<PathBuf, ProvisionerError> {
        if engagement.is_empty()
            || !engagement
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            || engagement.starts_with('.')
        {
            return Err(ProvisionerError::Config(format!(
                "invalid engagement name '{engagement}'"
            )));
        }
        Ok(self.settings.work_dir.join(engagement))
    }

    async fn write_program(
        &self,
        engagement: &str,
        manifest: Option<&DeploymentManifest>,
    ) -> Result<PathBuf, ProvisionerError> {
        let dir = self.stack_dir(engagement)?;
        tokio::fs::create_dir_all(&dir).await?;
        let program = render_program(manifest)?;
        tokio::fs::write(dir.join(PROGRAM_FILE), program).await?;
        debug!(dir = %dir.display(), "wrote program");
        Ok(dir)
    }

    /// Select or create the stack, pin the project and sync with the cloud.
    async fn prepare_stack(
        &self,
        cancel: &CancellationToken,
        dir: &Path,
        engagement: &str,
    ) -> Result<(), ProvisionerError> {
        self.run(cancel, dir, &["stack", "select", "--create", "--non-interactive", engagement])
            .await?;
        self.run(
            cancel,
            dir,
            &["config", "set", "gcp:project", &self.settings.project_id, "--stack", engagement],
        )
        .await?;
        self.run(cancel, dir, &["refresh", "--yes", "--non-interactive", "--stack", engagement])
            .await?;
        Ok(())
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        dir: &Path,
        args: &[&str],
    ) -> Result<Vec<u8>, ProvisionerError> {
        let program = self.settings.binary.display().to_string();
        let command_line = format!("{program} {}", args.join(" "));
        debug!(command = %command_line, dir = %dir.display(), "running pulumi");

        let mut command = Command::new(&self.settings.binary);
        command
            .args(args)
            .current_dir(dir)
            .env("PULUMI_SKIP_UPDATE_CHECK", "true")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(command = %command_line, "cancelled pulumi command");
                return Err(ProvisionerError::Cancelled);
            }
            output = command.output() => output.map_err(|source| ProvisionerError::Spawn {
                program: program.clone(),
                source,
            })?,
        };

        if !output.status.success() {
            return Err(ProvisionerError::Command {
                command: command_line,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl Provisioner for PulumiProvisioner {
    async fn export_state(
        &self,
        cancel: &CancellationToken,
        stack: &str,
    ) -> Result<Vec<StateRecord>, ProvisionerError> {
        tokio::fs::create_dir_all(&self.settings.work_dir).await?;
        let raw = self
            .run(cancel, &self.settings.work_dir, &["stack", "export", "--stack", stack])
            .await?;
        let records = decode_export(&raw)?;
        info!(stack, resources = records.len(), "exported stack state");
        Ok(records)
    }

    async fn apply(
        &self,
        cancel: &CancellationToken,
        engagement: &str,
        graph: &ResourceGraph,
    ) -> Result<(), ProvisionerError> {
        let manifest = DeploymentManifest::from_graph(
            graph,
            &self.settings.project_id,
            &self.settings.monitoring_project_id,
        );
        let dir = self.write_program(engagement, Some(&manifest)).await?;
        self.prepare_stack(cancel, &dir, engagement).await?;
        self.run(
            cancel,
            &dir,
            &["up", "--yes", "--skip-preview", "--non-interactive", "--stack", engagement],
        )
        .await?;
        info!(
            engagement,
            buckets = manifest.buckets.len(),
            service_accounts = manifest.service_accounts.len(),
            sinks = manifest.sinks.len(),
            "applied engagement"
        );
        Ok(())
    }

    async fn destroy(
        &self,
        cancel: &CancellationToken,
        engagement: &str,
    ) -> Result<(), ProvisionerError> {
        let dir = self.write_program(engagement, None).await?;
        self.prepare_stack(cancel, &dir, engagement).await?;
        self.run(cancel, &dir, &["destroy", "--yes", "--non-interactive", "--stack", engagement])
            .await?;
        info!(engagement, "destroyed engagement");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UntypedDeployment {
    version: i64,
    #[serde(default)]
    deployment: Value,
}

#[derive(Debug, Deserialize)]
struct DeploymentV3 {
    #[serde(default)]
    resources: Vec<StateRecord>,
}

/// Decode the output of `pulumi stack export`.
pub fn decode_export(raw: &[u8]) -> Result<Vec<StateRecord>, ProvisionerError> {
    let export: UntypedDeployment = serde_json::from_slice(raw)?;
    if export.version != SUPPORTED_DEPLOYMENT_VERSION {
        return Err(ProvisionerError::UnsupportedState(export.version));
    }
    let deployment: DeploymentV3 = serde_json::from_value(export.deployment)?;
    Ok(deployment.resources)
}

#[derive(Debug, Serialize)]
struct Program {
    name: &'static str,
    runtime: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    resources: BTreeMap<String, ProgramResource>,
}

#[derive(Debug, Serialize)]
struct ProgramResource {
    #[serde(rename = "type")]
    resource_type: &'static str,
    properties: Value,
}

impl ProgramResource {
    fn new(resource_type: &'static str, properties: Value) -> Self {
        Self {
            resource_type,
            properties,
        }
    }
}

/// Render the YAML program for a manifest. `None` renders an empty program.
pub fn render_program(manifest: Option<&DeploymentManifest>) -> Result<String, ProvisionerError> {
    let mut resources = BTreeMap::new();

    if let Some(manifest) = manifest {
        for bucket in &manifest.buckets {
            insert_resource(
                &mut resources,
                logical_name(&["bucket", &bucket.name]),
                ProgramResource::new(
                    "gcp:storage:Bucket",
                    json!({
                        "project": manifest.project_id,
                        "name": bucket.name,
                        "location": bucket.location,
                        "storageClass": bucket.storage_class,
                        "uniformBucketLevelAccess": true,
                        "forceDestroy": true,
                    }),
                ),
            )?;
        }

        for account in &manifest.service_accounts {
            insert_resource(
                &mut resources,
                logical_name(&["sa", &account.account_id]),
                ProgramResource::new(
                    "gcp:serviceaccount:Account",
                    json!({
                        "project": manifest.project_id,
                        "accountId": account.account_id,
                        "displayName": account.display_name,
                        "description": account.description,
                    }),
                ),
            )?;
        }

        for grant in &manifest.grants {
            let account = logical_name(&["sa", &grant.service_account]);
            let role = grant.binding.role.rsplit('/').next().unwrap_or_default();
            insert_resource(
                &mut resources,
                logical_name(&[&account, role, &grant.binding.principal_id]),
                ProgramResource::new(
                    "gcp:serviceaccount:IAMMember",
                    json!({
                        "serviceAccountId": format!("${{{account}.name}}"),
                        "role": grant.binding.role,
                        "member": grant.binding.principal_id,
                    }),
                ),
            )?;
        }

        for sink in &manifest.sinks {
            let sink_name = logical_name(&[&sink.name]);
            insert_resource(
                &mut resources,
                sink_name.clone(),
                ProgramResource::new(
                    "gcp:logging:ProjectSink",
                    json!({
                        "project": manifest.project_id,
                        "name": sink.name,
                        "destination": sink.destination,
                        "filter": sink.filter,
                        "uniqueWriterIdentity": true,
                    }),
                ),
            )?;
            insert_resource(
                &mut resources,
                format!("{sink_name}-log-writer"),
                ProgramResource::new(
                    "gcp:projects:IAMMember",
                    json!({
                        "project": manifest.monitoring_project_id,
                        "role": sink.writer_role,
                        "member": format!("${{{sink_name}.writerIdentity}}"),
                    }),
                ),
            )?;
        }
    }

    let program = Program {
        name: PROJECT_NAME,
        runtime: "yaml",
        description: "Paltergeist decoy engagement",
        resources,
    };
    Ok(serde_yaml::to_string(&program)?)
}

fn insert_resource(
    resources: &mut BTreeMap<String, ProgramResource>,
    name: String,
    resource: ProgramResource,
) -> Result<(), ProvisionerError> {
    match resources.entry(name) {
        btree_map::Entry::Occupied(slot) => {
            Err(ProvisionerError::DuplicateLogicalName(slot.key().clone()))
        }
        btree_map::Entry::Vacant(slot) => {
            slot.insert(resource);
            Ok(())
        }
    }
}

/// Join parts into a logical name safe for `${...}` interpolation.
///
/// Parts made only of lowercase letters, digits and dashes are kept as they
/// are. Anything else is slugged and suffixed with a digest of the raw parts,
/// so `acme.prod` and `acme-prod` stay distinct.
fn logical_name(parts: &[&str]) -> String {
    let slug = parts
        .iter()
        .map(|part| {
            part.chars()
                .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("-");

    let lossless = parts
        .iter()
        .all(|part| part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    if lossless {
        return slug;
    }

    let digest = format!("{:x}", Sha256::digest(parts.join("\n")));
    format!("{slug}-{}", &digest[..8])
}
