pub mod common;
pub mod deploy;
pub mod destroy;
pub mod graph;
pub mod schema;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Plan traps for an engagement and deploy them
    Deploy(deploy::DeployArgs),
    /// Tear down every trap of an engagement
    Destroy(destroy::DestroyArgs),
    /// Show the resource graph of the target stacks
    Graph(graph::GraphArgs),
    /// Print the response schema derived for a resource type
    Schema(schema::SchemaArgs),
}
