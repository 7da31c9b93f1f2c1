// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deterministic Graph Serialization
//!
//! The serialized form is the hand-off contract with the external
//! reconciliation engine, which diffs two serialized graphs to detect
//! "no change". Nodes are listed in key order and edges in
//! `(from, to, relation)` order, rendered to pretty JSON with a trailing
//! newline, so identical input always produces byte-identical output.

use serde::{Deserialize, Serialize};

use super::{Edge, NodeKey, ResourceGraph, ResourceNode};
use crate::errors::SynthesisResult;

/// Serialization format version, bumped on breaking layout changes
pub const FORMAT_VERSION: u32 = 1;

/// One node in the serialized listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub key: NodeKey,
    #[serde(flatten)]
    pub node: ResourceNode,
}

/// The stable serialized form of a resource graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedGraph {
    pub format_version: u32,
    pub nodes: Vec<SerializedNode>,
    pub edges: Vec<Edge>,
}

impl SerializedGraph {
    /// Capture a graph in serialization order
    pub fn from_graph(graph: &ResourceGraph) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            nodes: graph
                .nodes()
                .map(|(key, node)| SerializedNode {
                    key: key.clone(),
                    node: node.clone(),
                })
                .collect(),
            edges: graph.edges().cloned().collect(),
        }
    }

    /// Render to canonical JSON with a trailing newline
    pub fn to_canonical_json(&self) -> SynthesisResult<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}

/// Render a Mermaid topology diagram for humans
///
/// Network-shaped nodes (networks, subnets) are drawn round, everything
/// else rectangular. Node indices follow key order, so the diagram is
/// as deterministic as the JSON form.
pub fn to_mermaid(graph: &ResourceGraph) -> String {
    let mut output = String::new();
    output.push_str("graph TD\n");

    let keys: Vec<&NodeKey> = graph.nodes().map(|(key, _)| key).collect();

    for (idx, (key, node)) in graph.nodes().enumerate() {
        let (open, close) = match node {
            ResourceNode::Network { .. } | ResourceNode::Subnet(_) => ("(", ")"),
            _ => ("[", "]"),
        };
        output.push_str(&format!("    {idx}{open}\"{key}\"{close}\n"));
    }

    for edge in graph.edges() {
        let from_idx = keys.iter().position(|k| *k == &edge.from);
        let to_idx = keys.iter().position(|k| *k == &edge.to);
        if let (Some(from), Some(to)) = (from_idx, to_idx) {
            output.push_str(&format!("    {} -->|{}| {}\n", from, edge.relation, to));
        }
    }

    output.push_str("\n    classDef network fill:#fff3e0,stroke:#e65100;\n");
    output.push_str("    classDef security fill:#e1f5ff,stroke:#01579b;\n");

    output
}

/// Generate a plain-text topology report
pub fn topology_report(graph: &ResourceGraph) -> String {
    let mut report = String::new();
    report.push_str("# Topology Report\n\n");

    report.push_str("## Summary\n\n");
    report.push_str(&format!("- Nodes: {}\n", graph.node_count()));
    report.push_str(&format!("- Edges: {}\n", graph.edge_count()));
    report.push_str(&format!("- Subnets: {}\n", graph.subnets().count()));
    report.push_str(&format!(
        "- Security Groups: {}\n\n",
        graph.security_groups().count()
    ));

    report.push_str("## Subnets\n\n");
    for (key, subnet) in graph.subnets() {
        report.push_str(&format!(
            "- {} ({} tier, zone {}, {}, route {})\n",
            key, subnet.tier, subnet.zone, subnet.block, subnet.route
        ));
    }

    report.push_str("\n## Security Groups\n\n");
    for (key, group) in graph.security_groups() {
        report.push_str(&format!(
            "- {} (role {}, {} ingress / {} egress rules)\n",
            key,
            group.role,
            group.ingress.len(),
            group.egress.len()
        ));
    }

    report
}
