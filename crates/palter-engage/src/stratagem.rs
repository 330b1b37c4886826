use async_trait::async_trait;
use palter_core::config::{DEFAULT_REGION, DEFAULT_STORAGE_CLASS};
use palter_core::{is_target, Bucket, ResourceGraph, ServiceAccount};
use palter_generate::Generator;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::EngageError;

/// One named way of adding decoys to a graph.
#[async_trait]
pub trait Stratagem: Send + Sync {
    fn name(&self) -> &str;

    /// Sample targets from `graph` and add the generated decoys to it.
    ///
    /// Decoys are inserted one at a time. On error, the decoys inserted
    /// before the failure stay in the graph.
    async fn plan(
        &self,
        cancel: &CancellationToken,
        graph: &mut ResourceGraph,
    ) -> Result<(), EngageError>;
}

/// Service accounts that look like the ones already in use.
pub struct FollowTheYellowBrickRoad {
    generator: Generator,
    count: usize,
}

impl FollowTheYellowBrickRoad {
    pub const NAME: &'static str = "follow-the-yellow-brick-road";
    pub const DEFAULT_COUNT: usize = 3;

    pub fn new(generator: Generator) -> Self {
        Self {
            generator,
            count: Self::DEFAULT_COUNT,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

#[async_trait]
impl Stratagem for FollowTheYellowBrickRoad {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn plan(
        &self,
        cancel: &CancellationToken,
        graph: &mut ResourceGraph,
    ) -> Result<(), EngageError> {
        let examples: Vec<ServiceAccount> = graph
            .select::<ServiceAccount>(&[is_target])
            .into_iter()
            .cloned()
            .collect();
        if examples.is_empty() {
            warn!(stratagem = Self::NAME, "no target service accounts to sample");
            return Ok(());
        }

        let traps = self
            .generator
            .generate_many(cancel, &examples, self.count)
            .await?;
        for trap in traps {
            graph.add_trap(trap)?;
        }
        info!(stratagem = Self::NAME, count = self.count, "planned service account traps");
        Ok(())
    }
}

/// Buckets that look like they hold something worth stealing.
///
/// Location and storage class are pinned after generation so the decoys land
/// where the monitoring expects them.
pub struct CrownJewelGravityWell {
    generator: Generator,
    count: usize,
    location: String,
    storage_class: String,
}

impl CrownJewelGravityWell {
    pub const NAME: &'static str = "crown-jewel-gravity-well";
    pub const DEFAULT_COUNT: usize = 1;

    pub fn new(generator: Generator) -> Self {
        Self {
            generator,
            count: Self::DEFAULT_COUNT,
            location: DEFAULT_REGION.to_string(),
            storage_class: DEFAULT_STORAGE_CLASS.to_string(),
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_storage_class(mut self, storage_class: impl Into<String>) -> Self {
        self.storage_class = storage_class.into();
        self
    }
}

#[async_trait]
impl Stratagem for CrownJewelGravityWell {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn plan(
        &self,
        cancel: &CancellationToken,
        graph: &mut ResourceGraph,
    ) -> Result<(), EngageError> {
        let examples: Vec<Bucket> = graph
            .select::<Bucket>(&[is_target])
            .into_iter()
            .cloned()
            .collect();
        if examples.is_empty() {
            warn!(stratagem = Self::NAME, "no target buckets to sample");
            return Ok(());
        }

        let traps = self
            .generator
            .generate_many(cancel, &examples, self.count)
            .await?;
        for mut trap in traps {
            trap.location = self.location.clone();
            trap.storage_class = self.storage_class.clone();
            graph.add_trap(trap)?;
        }
        info!(
            stratagem = Self::NAME,
            count = self.count,
            location = %self.location,
            "planned bucket traps"
        );
        Ok(())
    }
}
