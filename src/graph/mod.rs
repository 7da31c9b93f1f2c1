// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Graph Arena
//!
//! The synthesized topology is an arena of typed nodes plus an explicit
//! edge list with relation tags, never direct pointers between mutable
//! objects. Nodes live in a `BTreeMap` and edges in a `BTreeSet`, so
//! iteration order is the serialization order and repeated synthesis
//! from identical input walks the graph identically.
//!
//! Node identity is a stable [`NodeKey`] derived from the environment
//! and resource names; nothing random or time-dependent enters the
//! graph.

pub mod serialize;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::domain::{
    AuditBinding, AvailabilityZone, CidrBlock, EnvironmentName, FilterRule, FleetSpec,
    KeyPolicy, LoadBalancerSpec, ScalingPolicy, SecurityGroup, Subnet, TargetGroupSpec,
};
use crate::errors::InternalInvariantError;

/// Stable node identifier, e.g. "env/prod/subnet/private-az1"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    /// Create a key from its full string form
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Build an environment-scoped key: "env/{name}/{part}/{part}.."
    pub fn scoped(env: &EnvironmentName, parts: &[&str]) -> Self {
        let mut key = format!("env/{env}");
        for part in parts {
            key.push('/');
            key.push_str(part);
        }
        Self(key)
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Relation tag on a directed edge
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Relation {
    DependsOn,
    AttachedTo,
    PlacedIn,
    EncryptedBy,
    RoutesTo,
    ForwardsTo,
    LogsTo,
}

impl Relation {
    /// Get the relation as its canonical kebab-case label
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::DependsOn => "depends-on",
            Relation::AttachedTo => "attached-to",
            Relation::PlacedIn => "placed-in",
            Relation::EncryptedBy => "encrypted-by",
            Relation::RoutesTo => "routes-to",
            Relation::ForwardsTo => "forwards-to",
            Relation::LogsTo => "logs-to",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed, tagged edge
///
/// Field order gives the derived `Ord` the serialization sort:
/// `(from, to, relation)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeKey,
    pub to: NodeKey,
    pub relation: Relation,
}

/// A typed graph node with its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "spec", rename_all = "kebab-case")]
pub enum ResourceNode {
    Network { base_block: CidrBlock },
    Subnet(Subnet),
    InternetGateway,
    NatGateway { zone: AvailabilityZone },
    SecurityGroup(SecurityGroup),
    FilterSet { rules: Vec<FilterRule> },
    Fleet(FleetSpec),
    LoadBalancer(LoadBalancerSpec),
    TargetGroup(TargetGroupSpec),
    ScalingPolicy(ScalingPolicy),
    EncryptionKey(KeyPolicy),
    AuditTrail(AuditBinding),
}

impl ResourceNode {
    /// The node kind as its canonical kebab-case label
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceNode::Network { .. } => "network",
            ResourceNode::Subnet(_) => "subnet",
            ResourceNode::InternetGateway => "internet-gateway",
            ResourceNode::NatGateway { .. } => "nat-gateway",
            ResourceNode::SecurityGroup(_) => "security-group",
            ResourceNode::FilterSet { .. } => "filter-set",
            ResourceNode::Fleet(_) => "fleet",
            ResourceNode::LoadBalancer(_) => "load-balancer",
            ResourceNode::TargetGroup(_) => "target-group",
            ResourceNode::ScalingPolicy(_) => "scaling-policy",
            ResourceNode::EncryptionKey(_) => "encryption-key",
            ResourceNode::AuditTrail(_) => "audit-trail",
        }
    }
}

/// The resource graph: sorted node arena plus sorted edge set
///
/// Built fresh per synthesis invocation from per-stage fragments and
/// never mutated after validation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGraph {
    nodes: BTreeMap<NodeKey, ResourceNode>,
    edges: BTreeSet<Edge>,
}

impl ResourceGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node under a key
    ///
    /// Two stages producing the same key is a synthesis bug, reported
    /// as `InternalInvariantError::DuplicateNode`.
    pub fn insert(
        &mut self,
        key: NodeKey,
        node: ResourceNode,
    ) -> Result<(), InternalInvariantError> {
        if self.nodes.contains_key(&key) {
            return Err(InternalInvariantError::DuplicateNode(key.to_string()));
        }
        self.nodes.insert(key, node);
        Ok(())
    }

    /// Add a directed edge
    ///
    /// Endpoints may be contributed by another fragment, so presence is
    /// not checked here; the pipeline calls [`verify_integrity`] once
    /// after the final merge.
    ///
    /// [`verify_integrity`]: ResourceGraph::verify_integrity
    pub fn connect(&mut self, from: NodeKey, to: NodeKey, relation: Relation) {
        self.edges.insert(Edge { from, to, relation });
    }

    /// Merge a fragment produced by a synthesis stage into this graph
    pub fn merge(&mut self, fragment: ResourceGraph) -> Result<(), InternalInvariantError> {
        for (key, node) in fragment.nodes {
            if self.nodes.contains_key(&key) {
                return Err(InternalInvariantError::MergeCollision(key.to_string()));
            }
            self.nodes.insert(key, node);
        }
        self.edges.extend(fragment.edges);
        Ok(())
    }

    /// Check that every edge endpoint resolves to a node
    pub fn verify_integrity(&self) -> Result<(), InternalInvariantError> {
        for edge in &self.edges {
            if !self.nodes.contains_key(&edge.from) {
                return Err(InternalInvariantError::DanglingEdge(edge.from.to_string()));
            }
            if !self.nodes.contains_key(&edge.to) {
                return Err(InternalInvariantError::DanglingEdge(edge.to.to_string()));
            }
        }
        Ok(())
    }

    /// Look up a node
    pub fn node(&self, key: &NodeKey) -> Option<&ResourceNode> {
        self.nodes.get(key)
    }

    /// All nodes in key order
    pub fn nodes(&self) -> impl Iterator<Item = (&NodeKey, &ResourceNode)> {
        self.nodes.iter()
    }

    /// All edges in `(from, to, relation)` order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges leaving a node
    pub fn outgoing<'a>(&'a self, key: &'a NodeKey) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| &e.from == key)
    }

    /// Edges arriving at a node
    pub fn incoming<'a>(&'a self, key: &'a NodeKey) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| &e.to == key)
    }

    /// Edges carrying one relation
    pub fn edges_with(&self, relation: Relation) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.relation == relation)
    }

    // ========================================================================
    // Typed node queries (used by the validator and tests)
    // ========================================================================

    /// All subnet nodes in key order
    pub fn subnets(&self) -> impl Iterator<Item = (&NodeKey, &Subnet)> {
        self.nodes.iter().filter_map(|(k, n)| match n {
            ResourceNode::Subnet(s) => Some((k, s)),
            _ => None,
        })
    }

    /// All security group nodes in key order
    pub fn security_groups(&self) -> impl Iterator<Item = (&NodeKey, &SecurityGroup)> {
        self.nodes.iter().filter_map(|(k, n)| match n {
            ResourceNode::SecurityGroup(g) => Some((k, g)),
            _ => None,
        })
    }

    /// All filter set nodes in key order
    pub fn filter_sets(&self) -> impl Iterator<Item = (&NodeKey, &[FilterRule])> {
        self.nodes.iter().filter_map(|(k, n)| match n {
            ResourceNode::FilterSet { rules } => Some((k, rules.as_slice())),
            _ => None,
        })
    }

    /// All fleet nodes in key order
    pub fn fleets(&self) -> impl Iterator<Item = (&NodeKey, &FleetSpec)> {
        self.nodes.iter().filter_map(|(k, n)| match n {
            ResourceNode::Fleet(f) => Some((k, f)),
            _ => None,
        })
    }

    /// All scaling policy nodes in key order
    pub fn scaling_policies(&self) -> impl Iterator<Item = (&NodeKey, &ScalingPolicy)> {
        self.nodes.iter().filter_map(|(k, n)| match n {
            ResourceNode::ScalingPolicy(p) => Some((k, p)),
            _ => None,
        })
    }

    /// All load balancer nodes in key order
    pub fn load_balancers(&self) -> impl Iterator<Item = (&NodeKey, &LoadBalancerSpec)> {
        self.nodes.iter().filter_map(|(k, n)| match n {
            ResourceNode::LoadBalancer(l) => Some((k, l)),
            _ => None,
        })
    }

    /// All encryption key nodes in key order
    pub fn encryption_keys(&self) -> impl Iterator<Item = (&NodeKey, &KeyPolicy)> {
        self.nodes.iter().filter_map(|(k, n)| match n {
            ResourceNode::EncryptionKey(p) => Some((k, p)),
            _ => None,
        })
    }

    /// All audit trail nodes in key order
    pub fn audit_trails(&self) -> impl Iterator<Item = (&NodeKey, &AuditBinding)> {
        self.nodes.iter().filter_map(|(k, n)| match n {
            ResourceNode::AuditTrail(b) => Some((k, b)),
            _ => None,
        })
    }
}
