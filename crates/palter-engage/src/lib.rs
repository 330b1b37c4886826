//! Stratagems, engagements and provisioning.
//!
//! An [`Engagement`] ingests the target stacks once through a
//! [`Provisioner`], runs its [`Stratagem`]s in order to add decoys to the
//! graph, and hands the result back to the provisioner to deploy.

pub mod engagement;
pub mod error;
pub mod provisioner;
pub mod stratagem;

#[cfg(test)]
pub(crate) mod testing;

pub use engagement::{Engagement, EngagementState, EngagementStatus};
pub use error::{EngageError, ErrorKind};
pub use provisioner::ingest::{ingest, IngestSummary};
pub use provisioner::manifest::DeploymentManifest;
pub use provisioner::pulumi::{PulumiProvisioner, PulumiSettings};
pub use provisioner::{Provisioner, ProvisionerError, StateRecord};
pub use stratagem::{CrownJewelGravityWell, FollowTheYellowBrickRoad, Stratagem};
