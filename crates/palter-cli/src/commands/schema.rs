use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use palter_core::{Bucket, CloudRunService, ResourceType, ServiceAccount, User};
use palter_generate::{derive_schema, ResponseSchema};

use crate::output::{self, OutputFormat};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ShapeName {
    ServiceAccount,
    Bucket,
    User,
    CloudRunService,
}

impl ShapeName {
    fn resource_type(self) -> ResourceType {
        match self {
            ShapeName::ServiceAccount => ResourceType::ServiceAccount,
            ShapeName::Bucket => ResourceType::Bucket,
            ShapeName::User => ResourceType::User,
            ShapeName::CloudRunService => ResourceType::CloudRunService,
        }
    }
}

#[derive(Args)]
pub struct SchemaArgs {
    /// Resource type to derive the schema for
    #[arg(value_enum)]
    pub shape: ShapeName,
}

pub fn run(args: &SchemaArgs, format: OutputFormat) -> Result<()> {
    let schema: ResponseSchema = match args.shape {
        ShapeName::ServiceAccount => derive_schema::<ServiceAccount>(),
        ShapeName::Bucket => derive_schema::<Bucket>(),
        ShapeName::User => derive_schema::<User>(),
        ShapeName::CloudRunService => derive_schema::<CloudRunService>(),
    }
    .with_context(|| format!("Failed to derive schema for {}", args.shape.resource_type()))?;

    println!(
        "{}",
        output::format::format_schema(args.shape.resource_type(), &schema, format)
    );
    Ok(())
}
