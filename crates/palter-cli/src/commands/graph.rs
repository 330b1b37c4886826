use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;

use palter_engage::Engagement;

use super::common::{ProjectArgs, StackArgs};
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct GraphArgs {
    #[command(flatten)]
    pub stacks: StackArgs,

    #[command(flatten)]
    pub project: ProjectArgs,
}

pub async fn run(args: &GraphArgs, cancel: &CancellationToken, format: OutputFormat) -> Result<()> {
    let provisioner = args.project.provisioner()?;
    let mut engagement = args
        .stacks
        .target_stacks
        .iter()
        .fold(Engagement::new("graph", provisioner), |e, stack| {
            e.with_target_stack(stack)
        });

    let graph = engagement
        .build_graph(cancel)
        .await
        .context("Failed to build graph from target stacks")?;

    println!("{}", output::format::format_graph(graph, format));
    Ok(())
}
