use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;

use palter_engage::Engagement;

use super::common::ProjectArgs;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct DestroyArgs {
    /// Engagement name to tear down
    #[arg(long, env = "ENGAGEMENT_NAME")]
    pub name: String,

    #[command(flatten)]
    pub project: ProjectArgs,
}

pub async fn run(args: &DestroyArgs, cancel: &CancellationToken, format: OutputFormat) -> Result<()> {
    let provisioner = args.project.provisioner()?;
    let mut engagement = Engagement::new(&args.name, provisioner);
    engagement
        .destroy(cancel)
        .await
        .with_context(|| format!("Failed to destroy engagement '{}'", args.name))?;

    println!("{}", output::format::format_status(&engagement.status(), format));
    Ok(())
}
