use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use palter_core::{EngagementSettings, GraphSummary, ResourceGraph};
use palter_generate::Generator;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::EngageError;
use crate::provisioner::ingest::ingest;
use crate::provisioner::Provisioner;
use crate::stratagem::{CrownJewelGravityWell, FollowTheYellowBrickRoad, Stratagem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementState {
    New,
    Planned,
    Deployed,
    Destroyed,
}

impl EngagementState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementState::New => "new",
            EngagementState::Planned => "planned",
            EngagementState::Deployed => "deployed",
            EngagementState::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for EngagementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of an engagement for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct EngagementStatus {
    pub id: Uuid,
    pub name: String,
    pub state: EngagementState,
    pub target_stacks: Vec<String>,
    pub stratagems: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `None` until the graph has been built.
    pub graph: Option<GraphSummary>,
}

/// One run of stratagems against the graph of a set of target stacks.
pub struct Engagement {
    id: Uuid,
    name: String,
    target_stacks: Vec<String>,
    stratagems: Vec<Box<dyn Stratagem>>,
    provisioner: Arc<dyn Provisioner>,
    graph: Option<ResourceGraph>,
    state: EngagementState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Engagement {
    pub fn new(name: impl Into<String>, provisioner: Arc<dyn Provisioner>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            target_stacks: Vec::new(),
            stratagems: Vec::new(),
            provisioner,
            graph: None,
            state: EngagementState::New,
            created_at: now,
            updated_at: now,
        }
    }

    /// Engagement running the built-in stratagems with the counts and pins
    /// from `settings`.
    pub fn from_settings(
        settings: &EngagementSettings,
        generator: Generator,
        provisioner: Arc<dyn Provisioner>,
    ) -> Result<Self, EngageError> {
        settings.validate()?;

        let mut engagement = Self::new(&settings.name, provisioner)
            .with_stratagem(
                FollowTheYellowBrickRoad::new(generator.clone())
                    .with_count(settings.service_account_traps),
            )
            .with_stratagem(
                CrownJewelGravityWell::new(generator)
                    .with_count(settings.bucket_traps)
                    .with_location(&settings.region)
                    .with_storage_class(&settings.storage_class),
            );
        engagement.target_stacks = settings.target_stacks.clone();
        Ok(engagement)
    }

    pub fn with_target_stack(mut self, stack: impl Into<String>) -> Self {
        self.target_stacks.push(stack.into());
        self
    }

    /// Append a stratagem. Stratagems run in the order they were added.
    pub fn with_stratagem(mut self, stratagem: impl Stratagem + 'static) -> Self {
        self.stratagems.push(Box::new(stratagem));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> EngagementState {
        self.state
    }

    /// The graph, if it has been built.
    pub fn graph(&self) -> Option<&ResourceGraph> {
        self.graph.as_ref()
    }

    pub fn status(&self) -> EngagementStatus {
        EngagementStatus {
            id: self.id,
            name: self.name.clone(),
            state: self.state,
            target_stacks: self.target_stacks.clone(),
            stratagems: self.stratagems.iter().map(|s| s.name().to_string()).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            graph: self.graph.as_ref().map(ResourceGraph::summary),
        }
    }

    /// Ingest the target stacks, once. Later calls return the same graph.
    pub async fn build_graph(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<&ResourceGraph, EngageError> {
        self.load_graph(cancel).await?;
        let graph: &ResourceGraph = self.graph.get_or_insert_with(ResourceGraph::new);
        Ok(graph)
    }

    /// Run every stratagem in order, then apply the graph.
    ///
    /// The first failing stratagem stops the rest. Decoys added before the
    /// failure stay in the graph, as do decoys added before the future is
    /// dropped.
    pub async fn plan(&mut self, cancel: &CancellationToken) -> Result<(), EngageError> {
        self.ensure_state("plan", &[EngagementState::New])?;

        self.load_graph(cancel).await?;
        let graph = self.graph.get_or_insert_with(ResourceGraph::new);
        run_stratagems(&self.stratagems, cancel, graph).await?;

        self.provisioner.apply(cancel, &self.name, graph).await?;
        self.transition(EngagementState::Planned);
        Ok(())
    }

    /// Apply the current graph again. Safe to repeat.
    pub async fn deploy(&mut self, cancel: &CancellationToken) -> Result<(), EngageError> {
        self.ensure_state(
            "deploy",
            &[
                EngagementState::New,
                EngagementState::Planned,
                EngagementState::Deployed,
            ],
        )?;

        self.load_graph(cancel).await?;
        let graph = self.graph.get_or_insert_with(ResourceGraph::new);
        if graph.traps().is_empty() {
            warn!(engagement = %self.name, "deploying an engagement without traps");
        }

        self.provisioner.apply(cancel, &self.name, graph).await?;
        self.transition(EngagementState::Deployed);
        Ok(())
    }

    /// Tear down everything deployed under this engagement's name.
    pub async fn destroy(&mut self, cancel: &CancellationToken) -> Result<(), EngageError> {
        self.provisioner.destroy(cancel, &self.name).await?;
        self.transition(EngagementState::Destroyed);
        Ok(())
    }

    /// Fill the graph slot from the target stacks unless it is already set.
    async fn load_graph(&mut self, cancel: &CancellationToken) -> Result<(), EngageError> {
        if self.graph.is_none() {
            let graph = self.ingest_targets(cancel).await?;
            self.graph = Some(graph);
        }
        Ok(())
    }

    async fn ingest_targets(&self, cancel: &CancellationToken) -> Result<ResourceGraph, EngageError> {
        if self.target_stacks.is_empty() {
            warn!(engagement = %self.name, "no target stacks to ingest");
        }

        let mut records = Vec::new();
        for stack in &self.target_stacks {
            if cancel.is_cancelled() {
                return Err(EngageError::Cancelled);
            }
            info!(engagement = %self.name, stack = %stack, "exporting target stack");
            records.extend(self.provisioner.export_state(cancel, stack).await?);
        }

        let mut graph = ResourceGraph::new();
        let summary = ingest(&mut graph, &records)?;
        info!(
            engagement = %self.name,
            stacks = self.target_stacks.len(),
            targets = summary.total_added(),
            "built graph"
        );
        Ok(graph)
    }

    fn ensure_state(
        &self,
        action: &'static str,
        allowed: &[EngagementState],
    ) -> Result<(), EngageError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(EngageError::InvalidState {
                action,
                state: self.state,
            })
        }
    }

    fn transition(&mut self, state: EngagementState) {
        info!(engagement = %self.name, from = %self.state, to = %state, "engagement state changed");
        self.state = state;
        self.updated_at = Utc::now();
    }
}

async fn run_stratagems(
    stratagems: &[Box<dyn Stratagem>],
    cancel: &CancellationToken,
    graph: &mut ResourceGraph,
) -> Result<(), EngageError> {
    for stratagem in stratagems {
        if cancel.is_cancelled() {
            return Err(EngageError::Cancelled);
        }
        info!(stratagem = stratagem.name(), "running stratagem");
        if let Err(source) = stratagem.plan(cancel, graph).await {
            error!(stratagem = stratagem.name(), error = %source, "stratagem failed");
            return Err(EngageError::Stratagem {
                name: stratagem.name().to_string(),
                source: Box::new(source),
            });
        }
    }
    Ok(())
}
