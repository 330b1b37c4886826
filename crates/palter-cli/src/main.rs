use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod output;

#[derive(Parser)]
#[command(
    name = "palter",
    version,
    about = "Plant cloud decoys that blend into real infrastructure"
)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: output::OutputFormat,

    #[command(subcommand)]
    command: commands::Commands,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let result = match &cli.command {
        commands::Commands::Deploy(args) => commands::deploy::run(args, &cancel, cli.format).await,
        commands::Commands::Destroy(args) => {
            commands::destroy::run(args, &cancel, cli.format).await
        }
        commands::Commands::Graph(args) => commands::graph::run(args, &cancel, cli.format).await,
        commands::Commands::Schema(args) => commands::schema::run(args, cli.format),
    };

    if let Err(err) = &result {
        tracing::error!(error = %format!("{err:#}"), "command failed");
    }
    result
}
