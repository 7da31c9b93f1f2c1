// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reconciliation Seam
//!
//! Synthesis plans; it never provisions. [`Reconciler`] is the boundary
//! where a provisioning backend would consume a planned graph, one node
//! at a time, in deterministic key order.
//!
//! A per-node failure is a result ([`ApplyStatus::Failed`]), not an
//! error: reconciliation walks the whole graph and reports what it
//! found. Only transport-level faults in the backend itself abort the
//! walk.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::graph::{NodeKey, ResourceGraph, ResourceNode};
use crate::service::run::ServiceResult;

/// What applying one node did to the target system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyStatus {
    /// The node did not exist and was created
    Created,
    /// The node existed but differed and was updated
    Updated,
    /// The node already matched the plan
    Unchanged,
    /// The backend could not apply this node
    Failed(String),
}

/// Consumes a planned graph node by node
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Bring the target system in line with one planned node
    async fn apply(&self, key: &NodeKey, node: &ResourceNode) -> ServiceResult<ApplyStatus>;
}

/// Tally of apply outcomes across one reconciliation walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl ReconcileStats {
    /// Nodes visited
    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged + self.failed
    }

    /// Whether every node applied without failure
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Walk a planned graph through a reconciler in key order
pub async fn reconcile<R>(graph: &ResourceGraph, reconciler: &R) -> ServiceResult<ReconcileStats>
where
    R: Reconciler + ?Sized,
{
    let mut stats = ReconcileStats::default();
    for (key, node) in graph.nodes() {
        match reconciler.apply(key, node).await? {
            ApplyStatus::Created => stats.created += 1,
            ApplyStatus::Updated => stats.updated += 1,
            ApplyStatus::Unchanged => stats.unchanged += 1,
            ApplyStatus::Failed(reason) => {
                warn!(key = %key, %reason, "node failed to apply");
                stats.failed += 1;
            }
        }
    }
    debug!(
        created = stats.created,
        updated = stats.updated,
        unchanged = stats.unchanged,
        failed = stats.failed,
        "reconciliation walk complete"
    );
    Ok(stats)
}

/// A reconciler that applies nothing
///
/// Stands in where a provisioning backend would plug in: every node
/// reports [`ApplyStatus::Unchanged`] and nothing outside the process
/// is touched.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunReconciler;

#[async_trait]
impl Reconciler for DryRunReconciler {
    async fn apply(&self, key: &NodeKey, node: &ResourceNode) -> ServiceResult<ApplyStatus> {
        debug!(key = %key, kind = node.kind(), "dry-run apply");
        Ok(ApplyStatus::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CidrBlock;
    use std::sync::Mutex;

    fn graph_with(keys: &[&str]) -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        for key in keys {
            graph
                .insert(
                    NodeKey::new(*key),
                    ResourceNode::Network {
                        base_block: CidrBlock::new("10.0.0.0/16").unwrap(),
                    },
                )
                .unwrap();
        }
        graph
    }

    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Reconciler for Recording {
        async fn apply(&self, key: &NodeKey, _node: &ResourceNode) -> ServiceResult<ApplyStatus> {
            self.seen.lock().unwrap().push(key.to_string());
            Ok(ApplyStatus::Created)
        }
    }

    struct FailOn(&'static str);

    #[async_trait]
    impl Reconciler for FailOn {
        async fn apply(&self, key: &NodeKey, _node: &ResourceNode) -> ServiceResult<ApplyStatus> {
            if key.as_str() == self.0 {
                Ok(ApplyStatus::Failed("backend rejected".into()))
            } else {
                Ok(ApplyStatus::Unchanged)
            }
        }
    }

    #[test]
    fn test_reconcile_visits_nodes_in_key_order() {
        let graph = graph_with(&["env/b/network", "env/a/network", "env/c/network"]);
        let recording = Recording {
            seen: Mutex::new(Vec::new()),
        };

        let stats = tokio_test::block_on(reconcile(&graph, &recording)).unwrap();
        assert_eq!(stats.created, 3);
        assert!(stats.is_clean());

        let seen = recording.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec!["env/a/network", "env/b/network", "env/c/network"]
        );
    }

    #[test]
    fn test_failed_apply_is_counted_not_fatal() {
        let graph = graph_with(&["env/a/network", "env/b/network"]);
        let stats = tokio_test::block_on(reconcile(&graph, &FailOn("env/a/network"))).unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.total(), 2);
        assert!(!stats.is_clean());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let graph = graph_with(&["env/a/network"]);
        let stats = tokio_test::block_on(reconcile(&graph, &DryRunReconciler)).unwrap();
        assert_eq!(stats.unchanged, 1);
        assert!(stats.is_clean());
    }
}
