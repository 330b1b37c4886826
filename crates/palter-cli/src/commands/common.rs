use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use palter_core::config::DEFAULT_REGION;
use palter_engage::{Provisioner, PulumiProvisioner, PulumiSettings};
use palter_generate::vertex::DEFAULT_MODEL;
use palter_generate::{ModelSettings, VertexClient};

#[derive(Args)]
pub struct ProjectArgs {
    /// Project that receives the traps
    #[arg(long = "target-project", env = "TARGET_PROJECT_ID")]
    pub target_project_id: String,

    /// Project that receives the audit log sinks
    #[arg(long = "paltergeist-project", env = "PALTERGEIST_PROJECT_ID")]
    pub paltergeist_project_id: String,

    /// Directory holding the generated Pulumi programs
    #[arg(long, env = "PULUMI_WORK_DIR", default_value = ".paltergeist")]
    pub work_dir: PathBuf,

    /// Pulumi executable
    #[arg(long, env = "PULUMI_BINARY", default_value = "pulumi")]
    pub pulumi_bin: PathBuf,
}

impl ProjectArgs {
    pub fn provisioner(&self) -> Result<Arc<dyn Provisioner>> {
        let mut settings = PulumiSettings::new(
            &self.work_dir,
            &self.target_project_id,
            &self.paltergeist_project_id,
        );
        settings.binary = self.pulumi_bin.clone();
        let provisioner =
            PulumiProvisioner::new(settings).context("Invalid provisioner settings")?;
        Ok(Arc::new(provisioner))
    }
}

#[derive(Args)]
pub struct StackArgs {
    /// Fully qualified stack to sample targets from (repeatable, comma separated)
    #[arg(long = "target-stack", env = "TARGET_STACK", value_delimiter = ',')]
    pub target_stacks: Vec<String>,
}

#[derive(Args)]
pub struct ModelArgs {
    /// Region for the model endpoint and generated buckets
    #[arg(long, env = "PALTERGEIST_REGION", default_value = DEFAULT_REGION)]
    pub region: String,

    /// Generative model name
    #[arg(long, env = "PALTERGEIST_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Maximum generation calls in flight
    #[arg(long, env = "PALTERGEIST_CONCURRENCY", default_value_t = 1)]
    pub concurrency: usize,

    /// Model endpoint override
    #[arg(long, env = "PALTERGEIST_MODEL_ENDPOINT")]
    pub model_endpoint: Option<String>,

    /// Bearer token for the model API (defaults to `gcloud auth print-access-token`)
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
}

impl ModelArgs {
    pub async fn connect(&self, project_id: &str) -> Result<Arc<VertexClient>> {
        let mut settings = ModelSettings::new(project_id);
        settings.location = self.region.clone();
        settings.model = self.model.clone();
        settings.endpoint = self.model_endpoint.clone();
        settings.access_token = self.access_token.clone();
        let client = VertexClient::connect(settings)
            .await
            .context("Failed to connect to the model backend")?;
        Ok(Arc::new(client))
    }
}
