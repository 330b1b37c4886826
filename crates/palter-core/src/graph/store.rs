use std::collections::{btree_map, BTreeMap};

use serde::Serialize;

use super::entry::{Entry, Predicate};
use crate::error::CoreError;
use crate::model::{Resource, ResourceType, Trap, Variant};

/// In-memory graph of target resources and traps.
///
/// Identities are unique across targets and traps. The graph carries no
/// locking; callers hand out `&mut` access to one writer at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceGraph {
    entries: BTreeMap<String, Entry>,
}

/// Per-type counts of targets and traps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub targets: BTreeMap<ResourceType, usize>,
    pub traps: BTreeMap<ResourceType, usize>,
}

impl GraphSummary {
    pub fn total_targets(&self) -> usize {
        self.targets.values().sum()
    }

    pub fn total_traps(&self) -> usize {
        self.traps.values().sum()
    }
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a real resource to the graph.
    pub fn add(&mut self, resource: impl Into<Resource>) -> Result<(), CoreError> {
        self.insert(Entry::target(resource.into()))
    }

    /// Add a resource marked as a trap.
    pub fn add_trap(&mut self, trap: impl Into<Resource>) -> Result<(), CoreError> {
        self.insert(Entry::trap(trap.into()))
    }

    fn insert(&mut self, entry: Entry) -> Result<(), CoreError> {
        match self.entries.entry(entry.id().to_string()) {
            btree_map::Entry::Occupied(existing) => Err(CoreError::DuplicateIdentity {
                id: existing.key().clone(),
                existing: existing.get().role(),
            }),
            btree_map::Entry::Vacant(slot) => {
                let entry = slot.insert(entry);
                let resource = entry.resource();
                if entry.is_trap() {
                    tracing::info!(id = entry.id(), resource_type = %resource.resource_type(), "added trap");
                } else {
                    tracing::debug!(id = entry.id(), kind = %resource.kind(), "added resource");
                }
                Ok(())
            }
        }
    }

    /// All entries, targets and traps. Order is not significant.
    pub fn resources(&self) -> Vec<&Entry> {
        self.entries.values().collect()
    }

    /// Resources of every entry marked as a trap.
    pub fn traps(&self) -> Vec<&Resource> {
        self.entries
            .values()
            .filter(|e| e.is_trap())
            .map(Entry::resource)
            .collect()
    }

    /// Select every resource of variant `T` matching all predicates.
    pub fn select<T: Variant>(&self, predicates: &[Predicate]) -> Vec<&T> {
        self.entries
            .values()
            .filter(|entry| predicates.iter().all(|matches| matches(entry)))
            .filter_map(|entry| T::from_resource(entry.resource()))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> GraphSummary {
        let mut summary = GraphSummary::default();
        for entry in self.entries.values() {
            let bucket = if entry.is_trap() {
                &mut summary.traps
            } else {
                &mut summary.targets
            };
            *bucket.entry(entry.resource().resource_type()).or_default() += 1;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{is_target, is_trap};
    use crate::model::{Bucket, ServiceAccount, User};

    fn sa(id: &str) -> ServiceAccount {
        ServiceAccount {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            email: format!("{id}@example.iam.gserviceaccount.com"),
        }
    }

    fn bucket(name: &str) -> Bucket {
        Bucket {
            name: name.into(),
            location: "us-central1".into(),
            storage_class: "STANDARD".into(),
        }
    }

    fn ids<T: Trap>(resources: Vec<&T>) -> Vec<String> {
        let mut ids: Vec<String> = resources.iter().map(|r| r.trap_id().to_string()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_add_and_select() {
        let mut g = ResourceGraph::new();
        g.add(sa("foo")).unwrap();
        g.add_trap(sa("bar")).unwrap();

        let service_accounts = g.select::<ServiceAccount>(&[]);
        assert_eq!(service_accounts.len(), 2);
        assert_eq!(g.resources().len(), 2);
    }

    #[test]
    fn test_select_by_predicate() {
        let mut g = ResourceGraph::new();
        g.add(sa("alice-sa")).unwrap();
        g.add_trap(sa("bob-sa")).unwrap();

        assert_eq!(g.select::<ServiceAccount>(&[]).len(), 2);
        assert_eq!(ids(g.select::<ServiceAccount>(&[is_target])), vec!["alice-sa"]);
        assert_eq!(ids(g.select::<ServiceAccount>(&[is_trap])), vec!["bob-sa"]);
    }

    #[test]
    fn test_select_filters_by_variant() {
        let mut g = ResourceGraph::new();
        g.add(sa("api-sa")).unwrap();
        g.add(bucket("data")).unwrap();
        g.add(User {
            name: "Alice".into(),
            email: "alice@example.com".into(),
        })
        .unwrap();
        g.add_trap(bucket("data-archive")).unwrap();

        assert_eq!(ids(g.select::<Bucket>(&[])), vec!["data", "data-archive"]);
        assert_eq!(ids(g.select::<User>(&[is_target])), vec!["alice@example.com"]);
        assert!(g.select::<User>(&[is_trap]).is_empty());
        assert!(g.select::<Bucket>(&[is_trap, is_target]).is_empty());
    }

    #[test]
    fn test_select_predicate_order_irrelevant() {
        fn has_email(entry: &Entry) -> bool {
            match entry.resource() {
                Resource::ServiceAccount(sa) => !sa.email.is_empty(),
                _ => false,
            }
        }

        let mut g = ResourceGraph::new();
        g.add(sa("a")).unwrap();
        g.add_trap(sa("b")).unwrap();
        g.add_trap(ServiceAccount {
            id: "c".into(),
            ..Default::default()
        })
        .unwrap();

        let forward = ids(g.select::<ServiceAccount>(&[is_trap, has_email]));
        let reverse = ids(g.select::<ServiceAccount>(&[has_email, is_trap]));
        assert_eq!(forward, vec!["b"]);
        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let mut g = ResourceGraph::new();
        g.add(sa("dup")).unwrap();
        let before = g.clone();

        let err = g.add(sa("dup")).unwrap_err();
        assert_eq!(
            err,
            CoreError::DuplicateIdentity {
                id: "dup".into(),
                existing: "target"
            }
        );
        let err = g.add_trap(sa("dup")).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateIdentity { .. }));
        assert_eq!(g, before);

        let mut g = ResourceGraph::new();
        g.add_trap(sa("dup")).unwrap();
        let err = g.add(sa("dup")).unwrap_err();
        assert_eq!(
            err,
            CoreError::DuplicateIdentity {
                id: "dup".into(),
                existing: "trap"
            }
        );
        assert!(g.get("dup").unwrap().is_trap());
    }

    #[test]
    fn test_duplicate_trap_over_target_bucket() {
        let mut g = ResourceGraph::new();
        g.add(bucket("data")).unwrap();

        let err = g.add_trap(bucket("data")).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateIdentity { ref id, .. } if id == "data"));
        assert!(g.traps().iter().all(|t| t.trap_id() != "data"));
        assert!(!g.get("data").unwrap().is_trap());
    }

    #[test]
    fn test_identity_namespace_spans_variants() {
        let mut g = ResourceGraph::new();
        g.add(bucket("shared")).unwrap();
        let err = g.add_trap(sa("shared")).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateIdentity { .. }));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_traps_only_returns_decoys() {
        let mut g = ResourceGraph::new();
        g.add(sa("real")).unwrap();
        g.add_trap(sa("fake")).unwrap();
        g.add_trap(bucket("fake-bucket")).unwrap();

        let mut traps: Vec<&str> = g.traps().iter().map(|t| t.trap_id()).collect();
        traps.sort();
        assert_eq!(traps, vec!["fake", "fake-bucket"]);
    }

    #[test]
    fn test_summary_counts() {
        let mut g = ResourceGraph::new();
        g.add(sa("a")).unwrap();
        g.add(sa("b")).unwrap();
        g.add(bucket("c")).unwrap();
        g.add_trap(sa("d")).unwrap();

        let summary = g.summary();
        assert_eq!(summary.targets[&ResourceType::ServiceAccount], 2);
        assert_eq!(summary.targets[&ResourceType::Bucket], 1);
        assert_eq!(summary.traps[&ResourceType::ServiceAccount], 1);
        assert_eq!(summary.total_targets(), 3);
        assert_eq!(summary.total_traps(), 1);
    }

    #[test]
    fn test_empty_graph() {
        let g = ResourceGraph::new();
        assert!(g.is_empty());
        assert!(g.traps().is_empty());
        assert!(g.select::<ServiceAccount>(&[is_target]).is_empty());
        assert!(!g.contains("anything"));
    }
}
