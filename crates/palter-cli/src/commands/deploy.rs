use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use palter_core::config::DEFAULT_STORAGE_CLASS;
use palter_core::EngagementSettings;
use palter_engage::{Engagement, EngagementStatus, Provisioner};
use palter_generate::{Generator, VertexClient};

use super::common::{ModelArgs, ProjectArgs};
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct DeployArgs {
    /// Engagement name, also the name of the deployed stack
    #[arg(long, env = "ENGAGEMENT_NAME")]
    pub name: String,

    /// Fully qualified stack to sample targets from (repeatable, comma separated)
    #[arg(
        long = "target-stack",
        env = "TARGET_STACK",
        value_delimiter = ',',
        required = true
    )]
    pub target_stacks: Vec<String>,

    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Number of service account traps
    #[arg(long, default_value_t = 3)]
    pub service_accounts: usize,

    /// Number of bucket traps
    #[arg(long, default_value_t = 1)]
    pub buckets: usize,

    /// Storage class pinned on bucket traps
    #[arg(long, default_value = DEFAULT_STORAGE_CLASS)]
    pub storage_class: String,
}

impl DeployArgs {
    fn settings(&self) -> EngagementSettings {
        let mut settings = EngagementSettings::new(
            &self.name,
            &self.project.target_project_id,
            &self.project.paltergeist_project_id,
        );
        settings.target_stacks = self.target_stacks.clone();
        settings.region = self.model.region.clone();
        settings.storage_class = self.storage_class.clone();
        settings.service_account_traps = self.service_accounts;
        settings.bucket_traps = self.buckets;
        settings
    }
}

pub async fn run(args: &DeployArgs, cancel: &CancellationToken, format: OutputFormat) -> Result<()> {
    let settings = args.settings();
    settings.validate().context("Invalid engagement settings")?;

    let provisioner = args.project.provisioner()?;
    let client = args.model.connect(&settings.paltergeist_project_id).await?;
    let generator = Generator::new(client.clone()).with_concurrency(args.model.concurrency);

    let result = plan_and_deploy(&settings, generator, provisioner, cancel).await;
    close_client(client);

    let status = result?;
    println!("{}", output::format::format_status(&status, format));
    Ok(())
}

async fn plan_and_deploy(
    settings: &EngagementSettings,
    generator: Generator,
    provisioner: Arc<dyn Provisioner>,
    cancel: &CancellationToken,
) -> Result<EngagementStatus> {
    let mut engagement = Engagement::from_settings(settings, generator, provisioner)?;
    engagement
        .plan(cancel)
        .await
        .with_context(|| format!("Failed to plan engagement '{}'", settings.name))?;
    engagement
        .deploy(cancel)
        .await
        .with_context(|| format!("Failed to deploy engagement '{}'", settings.name))?;
    Ok(engagement.status())
}

/// Close the model client once the engagement holding its clones is gone.
fn close_client(client: Arc<VertexClient>) {
    match Arc::try_unwrap(client) {
        Ok(client) => client.close(),
        Err(_) => debug!("model client still shared at shutdown"),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        deploy: DeployArgs,
    }

    #[tokio::test]
    async fn test_failed_engagement_releases_client() {
        use palter_engage::{PulumiProvisioner, PulumiSettings};
        use palter_generate::ModelSettings;

        let dir = tempfile::TempDir::new().unwrap();
        let provisioner: Arc<dyn Provisioner> = Arc::new(
            PulumiProvisioner::new(PulumiSettings::new(dir.path(), "acme-prod", "acme-monitor"))
                .unwrap(),
        );
        let mut model = ModelSettings::new("acme-monitor");
        model.access_token = Some("ya29.test".into());
        let client = Arc::new(VertexClient::connect(model).await.unwrap());
        let generator = Generator::new(client.clone());

        let settings = EngagementSettings::new("spring-2025", "acme-prod", "acme-monitor");
        let result =
            plan_and_deploy(&settings, generator, provisioner, &CancellationToken::new()).await;

        assert!(result.is_err());
        assert_eq!(Arc::strong_count(&client), 1);
        close_client(client);
    }

    #[test]
    fn test_settings_from_args() {
        let harness = Harness::try_parse_from([
            "palter",
            "--name",
            "spring-2025",
            "--target-stack",
            "acme/app/prod,acme/data/prod",
            "--target-project",
            "acme-prod",
            "--paltergeist-project",
            "acme-monitor",
            "--buckets",
            "2",
        ])
        .unwrap();

        let settings = harness.deploy.settings();
        assert_eq!(settings.target_stacks, vec!["acme/app/prod", "acme/data/prod"]);
        assert_eq!(settings.bucket_traps, 2);
        assert!(settings.validate().is_ok());
    }
}
